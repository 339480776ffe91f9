//! Engine lifecycle state machine
//!
//! ```text
//! ┌─────────┐  start   ┌─────────┐  shutdown  ┌──────────┐  last loop exits  ┌─────────┐
//! │ Stopped │ ───────► │ Running │ ─────────► │ Stopping │ ────────────────► │ Stopped │
//! └─────────┘          └─────────┘            └──────────┘                   └─────────┘
//! ```
//!
//! The state lives in a `watch` channel. Every transition is a single
//! compare-and-set under the channel's lock, and poll loops stop by watching
//! the same channel, so a loop can never keep acting on a stale `Running`.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No poll loops are running; `start` is allowed
    Stopped,

    /// Poll loops are running and submitting tasks
    Running,

    /// Shutdown requested; poll loops are exiting
    Stopping,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

pub(crate) struct Lifecycle {
    state: watch::Sender<EngineState>,
    live_loops: AtomicUsize,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(EngineState::Stopped);
        Self {
            state,
            live_loops: AtomicUsize::new(0),
        }
    }

    pub(crate) fn current(&self) -> EngineState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// `Stopped -> Running`, arming the count of loops about to be spawned
    ///
    /// Returns the state that blocked the transition on failure.
    pub(crate) fn begin_start(&self, loops: usize) -> Result<(), EngineState> {
        let mut observed = EngineState::Stopped;
        let started = self.state.send_if_modified(|state| {
            observed = *state;
            if *state != EngineState::Stopped {
                return false;
            }
            self.live_loops.store(loops, Ordering::SeqCst);
            *state = EngineState::Running;
            true
        });

        if started {
            Ok(())
        } else {
            Err(observed)
        }
    }

    /// `Running -> Stopping`, or straight to `Stopped` when no loop is alive
    ///
    /// Returns the new state, or `None` if the engine was not running.
    pub(crate) fn request_shutdown(&self) -> Option<EngineState> {
        let mut next = None;
        self.state.send_if_modified(|state| {
            if *state != EngineState::Running {
                return false;
            }
            let target = if self.live_loops.load(Ordering::SeqCst) == 0 {
                EngineState::Stopped
            } else {
                EngineState::Stopping
            };
            *state = target;
            next = Some(target);
            true
        });
        next
    }

    /// Record that a poll loop exited
    ///
    /// Returns true if this was the last loop and the engine is now `Stopped`.
    pub(crate) fn loop_exited(&self) -> bool {
        if self.live_loops.fetch_sub(1, Ordering::SeqCst) != 1 {
            return false;
        }
        self.state.send_if_modified(|state| {
            if *state == EngineState::Stopping {
                *state = EngineState::Stopped;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn live_loops(&self) -> usize {
        self.live_loops.load(Ordering::SeqCst)
    }
}

/// Resolve once `predicate` holds for the watched state
///
/// Also resolves if the sender is gone, since nothing can change the state
/// any more.
pub(crate) async fn wait_until(
    mut rx: watch::Receiver<EngineState>,
    predicate: impl Fn(EngineState) -> bool,
) {
    while !predicate(*rx.borrow_and_update()) {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Resolve once the engine leaves `Running`
pub(crate) async fn stop_requested(rx: watch::Receiver<EngineState>) {
    wait_until(rx, |state| state != EngineState::Running).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_state_display() {
        assert_eq!(EngineState::Stopped.to_string(), "stopped");
        assert_eq!(EngineState::Running.to_string(), "running");
        assert_eq!(EngineState::Stopping.to_string(), "stopping");
    }

    #[test]
    fn test_start_only_from_stopped() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.current(), EngineState::Stopped);

        assert!(lifecycle.begin_start(2).is_ok());
        assert_eq!(lifecycle.current(), EngineState::Running);
        assert_eq!(lifecycle.live_loops(), 2);

        assert_eq!(lifecycle.begin_start(2), Err(EngineState::Running));
        assert_eq!(lifecycle.live_loops(), 2);
    }

    #[test]
    fn test_shutdown_waits_for_loops() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start(2).unwrap();

        assert_eq!(lifecycle.request_shutdown(), Some(EngineState::Stopping));
        assert_eq!(lifecycle.request_shutdown(), None);
        assert_eq!(lifecycle.begin_start(2), Err(EngineState::Stopping));

        assert!(!lifecycle.loop_exited());
        assert_eq!(lifecycle.current(), EngineState::Stopping);

        assert!(lifecycle.loop_exited());
        assert_eq!(lifecycle.current(), EngineState::Stopped);
        assert_eq!(lifecycle.request_shutdown(), None);
    }

    #[test]
    fn test_shutdown_without_loops_stops_immediately() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start(0).unwrap();

        assert_eq!(lifecycle.request_shutdown(), Some(EngineState::Stopped));
        assert_eq!(lifecycle.current(), EngineState::Stopped);
    }

    #[test]
    fn test_restart_after_stop() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start(1).unwrap();
        lifecycle.request_shutdown();
        assert!(lifecycle.loop_exited());

        assert!(lifecycle.begin_start(1).is_ok());
        assert_eq!(lifecycle.current(), EngineState::Running);
    }

    #[tokio::test]
    async fn test_stop_requested_resolves_on_shutdown() {
        let lifecycle = std::sync::Arc::new(Lifecycle::new());
        lifecycle.begin_start(1).unwrap();

        let waiter = tokio::spawn(stop_requested(lifecycle.subscribe()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        lifecycle.request_shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve")
            .unwrap();
    }
}
