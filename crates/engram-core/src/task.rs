//! Single-task slots for background work
//!
//! A `TaskSlot` owns at most one spawned task. Spawning into an occupied slot
//! aborts the previous task first, cancelling is idempotent, and dropping the
//! slot aborts whatever is still running.
//!
//! The handle lives behind a `parking_lot::Mutex` that is never held across
//! an `.await`.

use parking_lot::Mutex;
use std::future::Future;
use tokio::task::JoinHandle;

/// Slot holding at most one running task
#[derive(Debug, Default)]
pub struct TaskSlot {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    /// Create an empty slot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut`, aborting the task currently in the slot
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.handle.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(fut));
    }

    /// Abort the task in the slot, if any
    ///
    /// Safe to call repeatedly and on an empty slot.
    pub fn cancel(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }

    /// Whether a task is in the slot and has not finished
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
