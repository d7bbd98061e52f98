//! One-shot cancellable timeout

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// A callback scheduled to run once after a delay unless cancelled first
///
/// Cancelling aborts the timer task. A callback that is already running when
/// `cancel` is called still completes, so callers must make firing idempotent.
#[derive(Debug)]
pub struct Deadline {
    task: JoinHandle<()>,
}

impl Deadline {
    pub fn arm<F>(runtime: &Handle, after: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = runtime.spawn(async move {
            tokio::time::sleep(after).await;
            on_fire();
        });
        Self { task }
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.task.abort();
    }
}
