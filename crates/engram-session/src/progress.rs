//! Loading flag shared by session state machines

use tokio::sync::watch;

pub(crate) trait Loading {
    fn set_loading(&mut self, loading: bool);
}

/// Holds `loading = true` until dropped, including on cancellation
pub(crate) struct LoadingGuard<'a, S: Loading> {
    state: &'a watch::Sender<S>,
}

impl<'a, S: Loading> LoadingGuard<'a, S> {
    pub(crate) fn begin(state: &'a watch::Sender<S>, reset: impl FnOnce(&mut S)) -> Self {
        state.send_modify(|s| {
            s.set_loading(true);
            reset(s);
        });
        Self { state }
    }
}

impl<S: Loading> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.set_loading(false));
    }
}
