use std::future::Future;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A unit of work that runs once a deadline passes unless cancelled first.
///
/// Dropping the handle cancels the work if it has not started yet.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Spawn `work` on the current runtime, to run at `deadline`.
    pub fn at<F>(deadline: Instant, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            work.await;
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Let the work run to completion regardless of this handle.
    ///
    /// Must be used from inside the work itself, which would otherwise abort
    /// its own task when the handle is dropped.
    pub fn detach(mut self) {
        self.handle = None;
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
