//! Observability events
//!
//! Poll and task outcomes are reported to the [`EngineObserver`] the engine
//! was built with. [`TracingObserver`] is the default and turns every event
//! into a structured `tracing` record.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Something that happened inside the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The engine entered `Running`
    Started { engine_id: String, workers: usize },

    /// A worker's poll loop began
    PollLoopStarted { worker: String },

    /// A poll tick finished submitting what the source returned
    PollCompleted { worker: String, tasks: usize },

    /// The source query failed; the tick was skipped
    PollFailed { worker: String, error: String },

    /// A task executed and was acknowledged
    TaskSucceeded { worker: String, task: String },

    /// A task failed; it was not acknowledged
    TaskFailed {
        worker: String,
        task: String,
        error: String,
    },

    /// A task executed but the acknowledgment failed
    AckFailed {
        worker: String,
        task: String,
        error: String,
    },

    /// A task was not submitted because the engine is shutting down
    SubmissionRejected { worker: String, task: String },

    /// A worker's poll loop exited
    PollLoopStopped { worker: String },

    /// The engine entered `Stopping`
    ShutdownRequested { engine_id: String },

    /// The engine entered `Stopped`
    Stopped { engine_id: String },
}

impl EngineEvent {
    /// The worker the event belongs to, if any
    pub fn worker(&self) -> Option<&str> {
        match self {
            Self::PollLoopStarted { worker }
            | Self::PollCompleted { worker, .. }
            | Self::PollFailed { worker, .. }
            | Self::TaskSucceeded { worker, .. }
            | Self::TaskFailed { worker, .. }
            | Self::AckFailed { worker, .. }
            | Self::SubmissionRejected { worker, .. }
            | Self::PollLoopStopped { worker } => Some(worker),
            Self::Started { .. } | Self::ShutdownRequested { .. } | Self::Stopped { .. } => None,
        }
    }
}

/// Receives engine events
///
/// Called synchronously from poll loops and executions, so implementations
/// should be quick and must not block. Forward to a channel if the handling
/// is expensive.
pub trait EngineObserver: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

impl<O: EngineObserver + ?Sized> EngineObserver for Arc<O> {
    fn on_event(&self, event: &EngineEvent) {
        (**self).on_event(event)
    }
}

/// Observer that writes events as `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::Started { engine_id, workers } => {
                info!(%engine_id, workers, "Engine started");
            }
            EngineEvent::PollLoopStarted { worker } => {
                debug!(%worker, "Poll loop started");
            }
            EngineEvent::PollCompleted { worker, tasks } => {
                if *tasks > 0 {
                    debug!(%worker, tasks, "Submitted polled tasks");
                } else {
                    tracing::trace!(%worker, "No tasks requested");
                }
            }
            EngineEvent::PollFailed { worker, error } => {
                error!(%worker, %error, "Poll failed, skipping tick");
            }
            EngineEvent::TaskSucceeded { worker, task } => {
                debug!(%worker, %task, "Task completed");
            }
            EngineEvent::TaskFailed {
                worker,
                task,
                error,
            } => {
                warn!(%worker, %task, %error, "Task execution failed");
            }
            EngineEvent::AckFailed {
                worker,
                task,
                error,
            } => {
                warn!(%worker, %task, %error, "Task executed but acknowledgment failed");
            }
            EngineEvent::SubmissionRejected { worker, task } => {
                debug!(%worker, %task, "Engine stopping, task left outstanding");
            }
            EngineEvent::PollLoopStopped { worker } => {
                debug!(%worker, "Poll loop exited");
            }
            EngineEvent::ShutdownRequested { engine_id } => {
                info!(%engine_id, "Shutdown requested");
            }
            EngineEvent::Stopped { engine_id } => {
                info!(%engine_id, "Engine stopped");
            }
        }
    }
}

/// Deliver an event without letting a faulty observer unwind into the caller
pub(crate) fn notify(observer: &dyn EngineObserver, event: EngineEvent) {
    if catch_unwind(AssertUnwindSafe(|| observer.on_event(&event))).is_err() {
        error!(?event, "Engine observer panicked");
    }
}
