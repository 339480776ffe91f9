//! Task sources
//!
//! This module provides:
//! - [`TaskSource`] trait the engine polls for outstanding work
//! - [`InMemoryTaskSource`] for testing and local runs

mod memory;
mod store;

pub use memory::InMemoryTaskSource;
pub use store::TaskSource;
