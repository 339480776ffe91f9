//! Error types for the engine and its collaborators

use std::time::Duration;

use crate::engine::EngineState;

/// Errors returned by engine lifecycle operations
///
/// These are the only failures visible to callers. Everything that happens
/// inside a poll tick or a task execution is reported through the
/// [`EngineObserver`](crate::observer::EngineObserver) instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `start` was called while the engine was not stopped
    #[error("engine is not stopped (current state: {0})")]
    NotStopped(EngineState),

    /// `start` was called outside a Tokio runtime
    #[error("no tokio runtime available to spawn poll loops")]
    NoRuntime,

    /// Two workers were configured with the same name
    #[error("duplicate worker name: {0}")]
    DuplicateWorker(String),

    /// Invalid configuration
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Executions were still running when the drain deadline passed
    #[error("drain timed out with {in_flight} execution(s) still in flight")]
    DrainTimeout { in_flight: usize },
}

/// Errors returned by a [`TaskSource`](crate::source::TaskSource)
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The backing system could not be reached
    #[error("task source unavailable: {0}")]
    Unavailable(String),

    /// The source refused the request (unknown task, bad worker name, ...)
    #[error("task source rejected request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors produced by a single task execution
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The executor reported a failure
    #[error("task failed: {0}")]
    Failed(String),

    /// The execution exceeded the configured per-task deadline
    #[error("task timed out after {0:?}")]
    TimedOut(Duration),

    /// The executor panicked
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    /// Create a failure from a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Render a panic payload as text
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
