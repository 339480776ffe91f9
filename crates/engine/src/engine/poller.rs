//! Per-worker poll loop
//!
//! Each worker gets one loop: tick, then sleep for the poll interval, until
//! the engine leaves `Running`. The delay is measured from the end of a tick,
//! so ticks for one worker never overlap.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, instrument};

use super::execution::{guarded, Execution};
use super::pool::ExecutionPool;
use super::state::{stop_requested, EngineState, Lifecycle};
use super::stats::Counters;
use crate::executor::Worker;
use crate::observer::{notify, EngineEvent, EngineObserver};
use crate::source::TaskSource;

/// Polls the source for one worker and submits what it finds
pub(crate) struct WorkerPoller<T> {
    worker: Worker<T>,
    source: Arc<dyn TaskSource<T>>,
    pool: Arc<ExecutionPool>,
    observer: Arc<dyn EngineObserver>,
    counters: Arc<Counters>,
    interval: Duration,
    task_timeout: Option<Duration>,
    state_rx: watch::Receiver<EngineState>,
    _exit: LoopExit,
}

/// Reports the loop's exit, including on unwind
pub(crate) struct LoopExit {
    pub(crate) engine_id: String,
    pub(crate) worker: String,
    pub(crate) lifecycle: Arc<Lifecycle>,
    pub(crate) observer: Arc<dyn EngineObserver>,
}

impl Drop for LoopExit {
    fn drop(&mut self) {
        notify(
            self.observer.as_ref(),
            EngineEvent::PollLoopStopped {
                worker: self.worker.clone(),
            },
        );
        if self.lifecycle.loop_exited() {
            notify(
                self.observer.as_ref(),
                EngineEvent::Stopped {
                    engine_id: self.engine_id.clone(),
                },
            );
        }
    }
}

/// Shared handles a poller is built from
pub(crate) struct PollerContext<T> {
    pub(crate) source: Arc<dyn TaskSource<T>>,
    pub(crate) pool: Arc<ExecutionPool>,
    pub(crate) observer: Arc<dyn EngineObserver>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) interval: Duration,
    pub(crate) task_timeout: Option<Duration>,
}

impl<T> WorkerPoller<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    pub(crate) fn new(
        worker: Worker<T>,
        ctx: &PollerContext<T>,
        state_rx: watch::Receiver<EngineState>,
        exit: LoopExit,
    ) -> Self {
        Self {
            worker,
            source: Arc::clone(&ctx.source),
            pool: Arc::clone(&ctx.pool),
            observer: Arc::clone(&ctx.observer),
            counters: Arc::clone(&ctx.counters),
            interval: ctx.interval,
            task_timeout: ctx.task_timeout,
            state_rx,
            _exit: exit,
        }
    }

    /// Run until the engine stops
    pub(crate) async fn run(self) {
        notify(
            self.observer.as_ref(),
            EngineEvent::PollLoopStarted {
                worker: self.worker.name().to_string(),
            },
        );

        loop {
            if self.is_shutdown() {
                debug!(worker = %self.worker.name(), "Poll loop: shutdown requested");
                break;
            }

            self.tick().await;

            if self.wait().await {
                break;
            }
        }
    }

    /// One poll cycle: query the source, submit every task it returns
    ///
    /// Returns once all tasks are submitted, not once they finish.
    #[instrument(skip(self), fields(worker = %self.worker.name()))]
    pub(crate) async fn tick(&self) {
        Counters::incr(&self.counters.polls);

        let query = guarded(self.source.find_requested(self.worker.name()));
        let result = tokio::select! {
            result = query => result,
            _ = stop_requested(self.state_rx.clone()) => {
                debug!("Shutdown during source query, abandoning tick");
                return;
            }
        };

        let tasks = match result {
            Ok(Ok(tasks)) => tasks,
            Ok(Err(e)) => {
                self.poll_failed(e.to_string());
                return;
            }
            Err(panic) => {
                self.poll_failed(format!("source panicked: {panic}"));
                return;
            }
        };

        let mut submitted = 0;
        let mut pending = tasks.into_iter();

        while let Some(task) = pending.next() {
            let permit = tokio::select! {
                biased;
                _ = stop_requested(self.state_rx.clone()) => None,
                permit = self.pool.acquire() => permit.ok(),
            };

            // Re-check after a possibly long wait for a slot
            let permit = match permit {
                Some(permit) if !self.is_shutdown() => permit,
                _ => {
                    for task in std::iter::once(task).chain(pending.by_ref()) {
                        self.reject(&task);
                    }
                    break;
                }
            };

            Counters::incr(&self.counters.tasks_submitted);
            self.pool.spawn(permit, self.execution().run(task));
            submitted += 1;
        }

        notify(
            self.observer.as_ref(),
            EngineEvent::PollCompleted {
                worker: self.worker.name().to_string(),
                tasks: submitted,
            },
        );
    }

    /// Wait for the poll interval
    ///
    /// Returns true if shutdown was signaled instead.
    async fn wait(&self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => false,
            _ = stop_requested(self.state_rx.clone()) => {
                debug!(worker = %self.worker.name(), "Shutdown signal received during wait");
                true
            }
        }
    }

    fn is_shutdown(&self) -> bool {
        *self.state_rx.borrow() != EngineState::Running
    }

    fn execution(&self) -> Execution<T> {
        Execution {
            worker: self.worker.name().to_string(),
            executor: self.worker.executor(),
            source: Arc::clone(&self.source),
            observer: Arc::clone(&self.observer),
            counters: Arc::clone(&self.counters),
            task_timeout: self.task_timeout,
        }
    }

    fn poll_failed(&self, error: String) {
        Counters::incr(&self.counters.poll_failures);
        notify(
            self.observer.as_ref(),
            EngineEvent::PollFailed {
                worker: self.worker.name().to_string(),
                error,
            },
        );
    }

    fn reject(&self, task: &T) {
        Counters::incr(&self.counters.submissions_rejected);
        notify(
            self.observer.as_ref(),
            EngineEvent::SubmissionRejected {
                worker: self.worker.name().to_string(),
                task: format!("{task:?}"),
            },
        );
    }
}
