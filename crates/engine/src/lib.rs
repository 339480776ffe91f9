//! # Drover Engine
//!
//! A pull-based work distribution engine: it polls a task source on behalf of
//! a set of named workers, runs what it finds on a bounded execution pool and
//! acknowledges successful tasks back to the source.
//!
//! ## Features
//!
//! - **One poll loop per worker**: fixed-delay, never overlapping, starting immediately
//! - **Shared execution pool**: capacity independent of worker count; a full
//!   pool blocks the submitting tick (backpressure) instead of queueing
//! - **Failure isolation**: executor errors, panics and deadline overruns are
//!   reported per task and never reach the poll loop or sibling tasks
//! - **Graceful shutdown**: stops polling without cancelling running tasks,
//!   with an explicit drain signal for callers that need quiescence
//!
//! ## Delivery guarantees
//!
//! At-least-once. Failed tasks are not retried by the engine; they are
//! executed again only if the source keeps reporting them. A task whose
//! acknowledgment fails may be executed again if the source re-offers it.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use drover_engine::prelude::*;
//!
//! # async fn run() -> Result<(), EngineError> {
//! let source = Arc::new(InMemoryTaskSource::new());
//! source.push("reports", 7u64);
//!
//! let engine = Engine::new(
//!     Arc::clone(&source),
//!     vec![Worker::new(
//!         "reports",
//!         executor_fn(|report_id: &u64| {
//!             let report_id = *report_id;
//!             async move {
//!                 tracing::info!(report_id, "rendering report");
//!                 Ok(())
//!             }
//!         }),
//!     )],
//!     EngineConfig::default().with_poll_interval(Duration::from_secs(1)),
//! )?;
//!
//! engine.start()?;
//! tokio::time::sleep(Duration::from_secs(5)).await;
//! engine.shutdown_and_drain(Duration::from_secs(30)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod observer;
pub mod source;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Engine, EngineState, EngineStats};
    pub use crate::error::{EngineError, SourceError, TaskError};
    pub use crate::executor::{executor_fn, TaskExecutor, Worker};
    pub use crate::observer::{EngineEvent, EngineObserver, TracingObserver};
    pub use crate::source::{InMemoryTaskSource, TaskSource};
}

// Re-export key types at crate root
pub use config::EngineConfig;
pub use engine::{Engine, EngineState, EngineStats};
pub use error::{EngineError, SourceError, TaskError};
pub use executor::{executor_fn, FnExecutor, TaskExecutor, Worker};
pub use observer::{EngineEvent, EngineObserver, TracingObserver};
pub use source::{InMemoryTaskSource, TaskSource};
