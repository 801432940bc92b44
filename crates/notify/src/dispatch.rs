//! Detached execution of fire-and-forget notification work.
//!
//! Work handed to the dispatcher is not tied to the request that produced it:
//! a client disconnect does not cancel it. [`Dispatcher::spawn`] runs a task
//! under the dispatcher's deadline and abandons it with a warning if it
//! exceeds it. [`Dispatcher::spawn_tracked`] is for work that must not be
//! dropped part-way (it holds a claim that only it can release) and bounds
//! each of its own steps instead.

use std::future::Future;
use std::time::Duration;

use tokio_util::task::TaskTracker;

/// Spawns and tracks detached tasks so shutdown can wait for them.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tracker: TaskTracker,
    deadline: Duration,
}

impl Dispatcher {
    pub fn new(deadline: Duration) -> Self {
        Self {
            tracker: TaskTracker::new(),
            deadline,
        }
    }

    /// Run `work` in the background under the dispatcher's deadline.
    pub fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = self.deadline;
        self.tracker.spawn(async move {
            if tokio::time::timeout(deadline, work).await.is_err() {
                tracing::warn!(
                    task = label,
                    deadline_ms = deadline.as_millis() as u64,
                    "Detached task exceeded its deadline and was dropped"
                );
            }
        });
    }

    /// Run `work` in the background without an outer deadline.
    ///
    /// Still tracked, so `flush` and `drain` wait for it.
    pub fn spawn_tracked<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(work);
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished.
    ///
    /// The dispatcher keeps accepting work afterwards.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting work and wait up to `grace` for running tasks.
    ///
    /// Returns `true` if everything finished in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(grace, self.tracker.wait()).await.is_ok();
        if drained {
            tracing::info!("Notification tasks drained");
        } else {
            tracing::warn!(
                remaining = self.tracker.len(),
                "Shutdown grace period elapsed with notification tasks still running"
            );
        }
        drained
    }
}
