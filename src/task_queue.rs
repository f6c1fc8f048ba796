//! Bounded task queue
//!
//! Accepts any number of submitted futures and runs them in FIFO batches of at
//! most `limit` tasks. A drain cycle takes a batch, waits for every task in it
//! to settle, then re-checks the pending list before finishing, so tasks
//! pushed while a batch is running (including by the running tasks) are picked
//! up by the same cycle.
//!
//! A failing or panicking task is logged and counted; it never affects its
//! siblings or the queue. There is no per-task timeout: a task that never
//! completes stalls its batch.

use crate::Result;
use futures::future::{BoxFuture, FutureExt, join_all};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Default number of tasks run concurrently
pub const DEFAULT_CONCURRENCY: usize = 128;

/// A queued unit of work
pub type Task = BoxFuture<'static, Result<()>>;

/// Snapshot of queue counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks waiting for a batch slot
    pub pending: usize,
    /// Tasks of the batch currently running
    pub in_flight: usize,
    /// Tasks that finished with `Ok`
    pub completed: u64,
    /// Tasks that returned `Err` or panicked
    pub failed: u64,
}

/// Self-draining concurrency limiter
///
/// Cloning is cheap; all clones share the same pending list, so tasks can
/// push follow-up work onto the queue that runs them.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

struct Inner {
    limit: usize,
    state: Mutex<QueueState>,
    idle: Notify,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Task>,
    in_flight: usize,
    /// Set while a drain cycle owns the queue
    draining: bool,
    completed: u64,
    failed: u64,
}

impl TaskQueue {
    /// Create a queue running at most `limit` tasks at once (0 is treated as 1)
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                limit: limit.max(1),
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
            }),
        }
    }

    /// Maximum number of concurrently running tasks
    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// Enqueue a task
    ///
    /// Starts a drain cycle in the background once a full batch is pending and
    /// no cycle is active. Never waits. Must be called from within a tokio
    /// runtime.
    pub fn push<F>(&self, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let start = {
            let mut state = self.lock();
            state.pending.push_back(task.boxed());
            claim_cycle(&mut state, self.inner.limit, false)
        };
        if start {
            self.spawn_cycle();
        }
    }

    /// Enqueue several tasks; an empty iterator is a no-op
    pub fn extend<I, F>(&self, tasks: I)
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let start = {
            let mut state = self.lock();
            let before = state.pending.len();
            state.pending.extend(tasks.into_iter().map(FutureExt::boxed));
            if state.pending.len() == before {
                return;
            }
            claim_cycle(&mut state, self.inner.limit, false)
        };
        if start {
            self.spawn_cycle();
        }
    }

    /// Drain the queue
    ///
    /// With `wait == false` this only makes the threshold-triggered drain
    /// attempt that [`push`](Self::push) makes. With `wait == true` it starts a
    /// cycle even for a partial batch and returns only once nothing is pending
    /// and nothing is in flight.
    pub async fn flush(&self, wait: bool) {
        if !wait {
            let start = claim_cycle(&mut self.lock(), self.inner.limit, false);
            if start {
                self.spawn_cycle();
            }
            return;
        }

        loop {
            // Register before inspecting state so a cycle finishing in between
            // still wakes us.
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let start = {
                let mut state = self.lock();
                if state.pending.is_empty() && !state.draining {
                    return;
                }
                claim_cycle(&mut state, self.inner.limit, true)
            };
            if start {
                self.spawn_cycle();
            }

            notified.await;
        }
    }

    /// Current counters
    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            pending: state.pending.len(),
            in_flight: state.in_flight,
            completed: state.completed,
            failed: state.failed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_cycle(&self) {
        let queue = self.clone();
        tokio::spawn(queue.drain_cycle());
    }

    async fn drain_cycle(self) {
        loop {
            let batch: Vec<Task> = {
                let mut state = self.lock();
                let take = state.pending.len().min(self.inner.limit);
                if take == 0 {
                    state.draining = false;
                    drop(state);
                    self.inner.idle.notify_waiters();
                    return;
                }
                state.in_flight = take;
                state.pending.drain(..take).collect()
            };

            let size = batch.len();
            tracing::trace!(batch = size, "Starting task batch");

            let results = join_all(batch.into_iter().map(tokio::spawn)).await;

            let mut completed = 0u64;
            let mut failed = 0u64;
            for result in results {
                match result {
                    Ok(Ok(())) => completed += 1,
                    Ok(Err(e)) => {
                        tracing::debug!(error = %e, "Queued task failed");
                        failed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Queued task panicked");
                        failed += 1;
                    }
                }
            }

            let mut state = self.lock();
            state.in_flight = 0;
            state.completed += completed;
            state.failed += failed;
        }
    }
}

/// Mark a drain cycle as active if one should start now
fn claim_cycle(state: &mut QueueState, limit: usize, force: bool) -> bool {
    if state.draining || state.pending.is_empty() {
        return false;
    }
    if !force && state.pending.len() < limit {
        return false;
    }
    state.draining = true;
    true
}
