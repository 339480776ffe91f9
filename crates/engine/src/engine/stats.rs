//! Engine counters

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::EngineState;

/// Lock-free counters shared by poll loops and executions
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) polls: AtomicU64,
    pub(crate) poll_failures: AtomicU64,
    pub(crate) tasks_submitted: AtomicU64,
    pub(crate) tasks_succeeded: AtomicU64,
    pub(crate) tasks_failed: AtomicU64,
    pub(crate) ack_failures: AtomicU64,
    pub(crate) submissions_rejected: AtomicU64,
}

impl Counters {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Point-in-time snapshot of engine activity
///
/// Counters are cumulative over the engine's lifetime, across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub state: EngineState,
    pub workers: usize,
    /// Poll ticks that queried the source
    pub polls: u64,
    /// Poll ticks whose source query failed
    pub poll_failures: u64,
    pub tasks_submitted: u64,
    /// Tasks that executed successfully (acknowledged or not)
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    /// Successful executions whose acknowledgment failed
    pub ack_failures: u64,
    /// Tasks left outstanding because a shutdown interrupted submission
    pub submissions_rejected: u64,
    /// Executions currently running
    pub in_flight: usize,
    pub available_slots: usize,
    pub max_concurrency: usize,
    /// When the engine was last started
    pub started_at: Option<DateTime<Utc>>,
}

pub(crate) struct StatsContext {
    pub(crate) state: EngineState,
    pub(crate) workers: usize,
    pub(crate) in_flight: usize,
    pub(crate) available_slots: usize,
    pub(crate) max_concurrency: usize,
    pub(crate) started_at: Option<DateTime<Utc>>,
}

impl Counters {
    pub(crate) fn snapshot(&self, ctx: StatsContext) -> EngineStats {
        EngineStats {
            state: ctx.state,
            workers: ctx.workers,
            polls: Self::get(&self.polls),
            poll_failures: Self::get(&self.poll_failures),
            tasks_submitted: Self::get(&self.tasks_submitted),
            tasks_succeeded: Self::get(&self.tasks_succeeded),
            tasks_failed: Self::get(&self.tasks_failed),
            ack_failures: Self::get(&self.ack_failures),
            submissions_rejected: Self::get(&self.submissions_rejected),
            in_flight: ctx.in_flight,
            available_slots: ctx.available_slots,
            max_concurrency: ctx.max_concurrency,
            started_at: ctx.started_at,
        }
    }
}
