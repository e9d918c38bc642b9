//! Bounded-concurrency task runner with first-error cancellation.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Runs a tree of short-lived tasks under a fixed concurrency budget.
///
/// One scheduler serves one top-level request: tasks are scheduled (also
/// recursively, from inside running tasks), then [`Scheduler::wait`] is
/// called exactly once at the root and the scheduler is discarded. The
/// first task failure cancels the whole tree; failures after the first
/// are discarded without trace.
///
/// Cancellation is cooperative. Tasks observe [`Scheduler::token`] at
/// safe suspension points and return `Ok(())` when it fires; a task that
/// has not yet claimed a slot when the token fires is dropped unrun.
pub struct Scheduler<E> {
    inner: Arc<Inner<E>>,
}

struct Inner<E> {
    cancel: CancellationToken,
    slots: Semaphore,
    first_error: Mutex<Option<E>>,
    failed: Notify,
    tracker: TaskTracker,
}

impl<E> Clone for Scheduler<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> std::fmt::Debug for Scheduler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("available_slots", &self.inner.slots.available_permits())
            .field("cancelled", &self.inner.cancel.is_cancelled())
            .finish()
    }
}

impl<E: Send + 'static> Scheduler<E> {
    /// Creates a scheduler whose cancellation token is derived from
    /// `parent`, with `budget` concurrent slots.
    pub fn new(parent: &CancellationToken, budget: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancel: parent.child_token(),
                slots: Semaphore::new(budget.max(1)),
                first_error: Mutex::new(None),
                failed: Notify::new(),
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Token shared by every task of this scheduler.
    pub fn token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Enqueues a unit of work for concurrent execution.
    ///
    /// The slot is claimed inside the spawned task, so scheduling from a
    /// running task never blocks the caller even when the pool is
    /// saturated.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = inner.cancel.cancelled() => return,
                permit = inner.slots.acquire() => match permit {
                    Ok(permit) => permit,
                    // the semaphore is never closed
                    Err(_) => return,
                },
            };
            if inner.cancel.is_cancelled() {
                return;
            }
            if let Err(err) = task.await {
                inner.fail(err).await;
            }
        });
    }

    /// Blocks until every scheduled task has completed, or until the
    /// first failure.
    ///
    /// On failure the shared token is cancelled and the error is handed
    /// back immediately; tasks still in flight wind down cooperatively
    /// in the background.
    pub async fn wait(self) -> Result<(), E> {
        let inner = self.inner;
        inner.tracker.close();
        tokio::select! {
            biased;
            _ = inner.failed.notified() => inner.cancel.cancel(),
            _ = inner.tracker.wait() => {}
        }
        match inner.first_error.lock().await.take() {
            Some(err) => {
                inner.cancel.cancel();
                Err(err)
            }
            None => Ok(()),
        }
    }
}

impl<E> Inner<E> {
    async fn fail(&self, err: E) {
        let mut slot = self.first_error.lock().await;
        if slot.is_none() {
            *slot = Some(err);
            self.failed.notify_one();
            self.cancel.cancel();
        }
    }
}
