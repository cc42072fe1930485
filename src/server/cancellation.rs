//! Process-wide cancellation registry.
//!
//! `tasks/cancel` inserts a task id here before the canceled state is
//! persisted; the task engine checks membership at every yield boundary, and
//! handlers can poll it cooperatively through their context.

use std::collections::HashSet;
use std::sync::Mutex;

use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// Set of task ids with a pending or delivered cancellation.
///
/// Wrapped in an `Arc` and shared between the dispatcher, the task engine,
/// and every in-flight handler context.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    ids: Mutex<HashSet<String>>,
    notify: Notify,
}

impl CancellationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a task as cancelled and wake any engine blocked on a handler
    /// yield.
    pub fn add(&self, task_id: &str) {
        let mut ids = self.ids.lock().expect("cancellation registry poisoned");
        ids.insert(task_id.to_string());
        drop(ids);
        self.notify.notify_waiters();
    }

    /// Clear a task's cancellation mark (after the canceled state is final).
    pub fn remove(&self, task_id: &str) {
        let mut ids = self.ids.lock().expect("cancellation registry poisoned");
        ids.remove(task_id);
    }

    /// Whether a cancellation is pending for the task.
    pub fn contains(&self, task_id: &str) -> bool {
        let ids = self.ids.lock().expect("cancellation registry poisoned");
        ids.contains(task_id)
    }

    /// A future that resolves the next time any cancellation lands.
    ///
    /// Callers must create (and `enable`) the future before re-checking
    /// [`contains`](Self::contains), then await it, so an `add` racing the
    /// check is never missed.
    pub fn changed(&self) -> Notified<'_> {
        self.notify.notified()
    }
}
