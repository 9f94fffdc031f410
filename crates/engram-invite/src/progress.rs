//! In-progress flag of invite creation

use tokio::sync::watch;

/// State with a `creating` flag
pub(crate) trait Creating {
    fn set_creating(&mut self, creating: bool);
}

/// Holds `creating = true` until dropped
///
/// Dropping clears the flag on every exit path, including cancellation of
/// the future that owns the guard.
pub(crate) struct CreatingGuard<'a, S: Creating> {
    state: &'a watch::Sender<S>,
}

impl<'a, S: Creating> CreatingGuard<'a, S> {
    /// Raise the flag and apply `reset` in the same update
    pub(crate) fn begin(state: &'a watch::Sender<S>, reset: impl FnOnce(&mut S)) -> Self {
        state.send_modify(|s| {
            s.set_creating(true);
            reset(s);
        });
        Self { state }
    }
}

impl<S: Creating> Drop for CreatingGuard<'_, S> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.set_creating(false));
    }
}
