//! Scheduling engine
//!
//! This module provides:
//! - [`Engine`] - starts one poll loop per worker and owns the execution pool
//! - [`EngineState`] - lifecycle state (`Stopped`, `Running`, `Stopping`)
//! - [`EngineStats`] - counters snapshot
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Engine                              │
//! │  ┌──────────────┐  ┌──────────────┐       ┌──────────────┐   │
//! │  │ WorkerPoller │  │ WorkerPoller │  ...  │ WorkerPoller │   │
//! │  │  (worker A)  │  │  (worker B)  │       │  (worker N)  │   │
//! │  └──────┬───────┘  └──────┬───────┘       └──────┬───────┘   │
//! │         │ find_requested  │                      │           │
//! │         ▼                 ▼                      ▼           │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        ExecutionPool (Semaphore, fixed capacity)        │  │
//! │  │  [exec] [exec] [exec] ... [exec]  → mark_completed     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod execution;
mod poller;
mod pool;
mod scheduler;
mod state;
mod stats;

pub use scheduler::Engine;
pub use state::EngineState;
pub use stats::EngineStats;
