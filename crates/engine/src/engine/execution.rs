//! Running a single task
//!
//! Every failure mode of one execution (error, panic, deadline) ends here as
//! an event and a counter. Nothing propagates to the poll loop or to sibling
//! executions.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::stats::Counters;
use crate::error::{panic_message, TaskError};
use crate::executor::TaskExecutor;
use crate::observer::{notify, EngineEvent, EngineObserver};
use crate::source::TaskSource;

/// Everything an execution needs, cloned once per task
pub(crate) struct Execution<T> {
    pub(crate) worker: String,
    pub(crate) executor: Arc<dyn TaskExecutor<T>>,
    pub(crate) source: Arc<dyn TaskSource<T>>,
    pub(crate) observer: Arc<dyn EngineObserver>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) task_timeout: Option<Duration>,
}

impl<T> Execution<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    /// Execute `task`, acknowledge it on success, report the outcome
    pub(crate) async fn run(self, task: T) {
        let outcome = invoke(self.executor.as_ref(), &task, self.task_timeout).await;

        if let Err(error) = outcome {
            Counters::incr(&self.counters.tasks_failed);
            notify(
                self.observer.as_ref(),
                EngineEvent::TaskFailed {
                    worker: self.worker,
                    task: format!("{task:?}"),
                    error: error.to_string(),
                },
            );
            return;
        }

        Counters::incr(&self.counters.tasks_succeeded);

        let ack = match guarded(self.source.mark_completed_by(&self.worker, &task)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(panic) => Err(format!("acknowledgment panicked: {panic}")),
        };

        let event = match ack {
            Ok(()) => EngineEvent::TaskSucceeded {
                worker: self.worker,
                task: format!("{task:?}"),
            },
            Err(error) => {
                Counters::incr(&self.counters.ack_failures);
                EngineEvent::AckFailed {
                    worker: self.worker,
                    task: format!("{task:?}"),
                    error,
                }
            }
        };
        notify(self.observer.as_ref(), event);
    }
}

/// Call the executor, converting panics and deadline overruns into errors
pub(crate) async fn invoke<T>(
    executor: &dyn TaskExecutor<T>,
    task: &T,
    timeout: Option<Duration>,
) -> Result<(), TaskError> {
    let call = guarded(executor.execute(task));

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => return Err(TaskError::TimedOut(limit)),
        },
        None => call.await,
    };

    result.unwrap_or_else(|panic| Err(TaskError::Panicked(panic)))
}

/// Await `fut`, catching a panic as its message
pub(crate) async fn guarded<F: Future>(fut: F) -> Result<F::Output, String> {
    AssertUnwindSafe(fut).catch_unwind().await.map_err(panic_message)
}
