//! Drover worker process
//!
//! Hosts a [`drover_engine::Engine`] over an in-memory demo source. The
//! modules are split out of `main.rs` so they can be tested.

pub mod config;
pub mod demo;
pub mod telemetry;

pub use config::WorkerConfig;
pub use demo::{DemoExecutor, DemoTask};
pub use telemetry::{init_telemetry, TelemetryConfig};
