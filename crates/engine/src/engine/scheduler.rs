//! The scheduling engine
//!
//! Owns the worker list, the execution pool and the lifecycle, and spawns one
//! [`WorkerPoller`] per worker on start.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::poller::{LoopExit, PollerContext, WorkerPoller};
use super::pool::ExecutionPool;
use super::state::{wait_until, EngineState, Lifecycle};
use super::stats::{Counters, EngineStats, StatsContext};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::executor::Worker;
use crate::observer::{notify, EngineEvent, EngineObserver, TracingObserver};
use crate::source::TaskSource;

/// Pull-based scheduling engine
///
/// Polls a [`TaskSource`] on behalf of each configured [`Worker`] and runs
/// what it finds on a shared pool of `max_concurrency` execution slots.
///
/// # Example
///
/// ```ignore
/// use drover_engine::prelude::*;
///
/// let source = Arc::new(InMemoryTaskSource::new());
/// source.push("emails", Job { id: 1 });
///
/// let engine = Engine::new(
///     Arc::clone(&source),
///     vec![Worker::new("emails", SendEmail::new(smtp))],
///     EngineConfig::default().with_max_concurrency(4),
/// )?;
///
/// engine.start()?;
///
/// // ... later
/// engine.shutdown_and_drain(Duration::from_secs(30)).await?;
/// ```
pub struct Engine<T> {
    engine_id: String,
    workers: Vec<Worker<T>>,
    config: EngineConfig,
    source: Arc<dyn TaskSource<T>>,
    observer: Arc<dyn EngineObserver>,
    pool: Arc<ExecutionPool>,
    counters: Arc<Counters>,
    lifecycle: Arc<Lifecycle>,
    started_at: Mutex<Option<DateTime<Utc>>>,
}

impl<T> Engine<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    /// Create a stopped engine
    ///
    /// Fails if the configuration is invalid, a worker name is empty, or two
    /// workers share a name.
    pub fn new<S>(
        source: S,
        workers: Vec<Worker<T>>,
        config: EngineConfig,
    ) -> Result<Self, EngineError>
    where
        S: TaskSource<T> + 'static,
    {
        config.validate()?;

        let mut seen = HashSet::with_capacity(workers.len());
        for worker in &workers {
            if worker.name().is_empty() {
                return Err(EngineError::InvalidConfig(
                    "worker name must not be empty".into(),
                ));
            }
            if !seen.insert(worker.name()) {
                return Err(EngineError::DuplicateWorker(worker.name().to_string()));
            }
        }

        Ok(Self {
            engine_id: format!("engine-{}", Uuid::now_v7()),
            pool: Arc::new(ExecutionPool::new(config.max_concurrency)),
            workers,
            config,
            source: Arc::new(source),
            observer: Arc::new(TracingObserver),
            counters: Arc::new(Counters::default()),
            lifecycle: Arc::new(Lifecycle::new()),
            started_at: Mutex::new(None),
        })
    }

    /// Replace the default [`TracingObserver`]
    pub fn with_observer(mut self, observer: impl EngineObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Set the engine ID used in events and log spans
    pub fn with_engine_id(mut self, id: impl Into<String>) -> Self {
        self.engine_id = id.into();
        self
    }

    /// Start one poll loop per worker
    ///
    /// The first tick of every loop happens immediately. Must be called from
    /// within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotStopped`] if the engine is running or still stopping
    /// - [`EngineError::NoRuntime`] outside a Tokio runtime
    #[instrument(skip(self), fields(engine_id = %self.engine_id))]
    pub fn start(&self) -> Result<(), EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        self.lifecycle
            .begin_start(self.workers.len())
            .map_err(EngineError::NotStopped)?;

        self.pool.open();
        *self.started_at.lock() = Some(Utc::now());

        info!(
            workers = self.workers.len(),
            max_concurrency = self.config.max_concurrency,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Starting engine"
        );
        notify(
            self.observer.as_ref(),
            EngineEvent::Started {
                engine_id: self.engine_id.clone(),
                workers: self.workers.len(),
            },
        );

        let ctx = PollerContext {
            source: Arc::clone(&self.source),
            pool: Arc::clone(&self.pool),
            observer: Arc::clone(&self.observer),
            counters: Arc::clone(&self.counters),
            interval: self.config.poll_interval,
            task_timeout: self.config.task_timeout,
        };

        for worker in &self.workers {
            let exit = LoopExit {
                engine_id: self.engine_id.clone(),
                worker: worker.name().to_string(),
                lifecycle: Arc::clone(&self.lifecycle),
                observer: Arc::clone(&self.observer),
            };
            let poller = WorkerPoller::new(worker.clone(), &ctx, self.lifecycle.subscribe(), exit);
            runtime.spawn(poller.run());
        }

        Ok(())
    }

    /// Stop scheduling poll ticks
    ///
    /// Executions already submitted keep running; this does not wait for
    /// them. Use [`wait_drained`](Self::wait_drained) or
    /// [`shutdown_and_drain`](Self::shutdown_and_drain) for that. Calling it
    /// again, or on a stopped engine, does nothing.
    #[instrument(skip(self), fields(engine_id = %self.engine_id))]
    pub fn shutdown(&self) {
        let Some(next) = self.lifecycle.request_shutdown() else {
            debug!(state = %self.state(), "Shutdown ignored, engine not running");
            return;
        };

        self.pool.close();

        notify(
            self.observer.as_ref(),
            EngineEvent::ShutdownRequested {
                engine_id: self.engine_id.clone(),
            },
        );
        if next == EngineState::Stopped {
            notify(
                self.observer.as_ref(),
                EngineEvent::Stopped {
                    engine_id: self.engine_id.clone(),
                },
            );
        }
    }

    /// Resolve once the engine is `Stopped`
    pub async fn wait_stopped(&self) {
        wait_until(self.lifecycle.subscribe(), |state| {
            state == EngineState::Stopped
        })
        .await
    }

    /// Resolve once the engine is stopped and every submitted execution has
    /// finished
    ///
    /// If the engine is started again before the drain completes, this keeps
    /// waiting until the next shutdown.
    pub async fn wait_drained(&self) {
        // Closed by the shutdown that moved the engine out of `Running`
        self.wait_stopped().await;
        self.pool.drained().await;
    }

    /// Shut down and wait for in-flight executions, up to `timeout`
    #[instrument(skip(self), fields(engine_id = %self.engine_id))]
    pub async fn shutdown_and_drain(&self, timeout: Duration) -> Result<(), EngineError> {
        self.shutdown();

        match tokio::time::timeout(timeout, self.wait_drained()).await {
            Ok(()) => {
                info!("Engine drained");
                Ok(())
            }
            Err(_) => Err(EngineError::DrainTimeout {
                in_flight: self.pool.in_flight(),
            }),
        }
    }
}

impl<T> Engine<T> {
    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.lifecycle.current()
    }

    /// Snapshot of engine counters
    pub fn stats(&self) -> EngineStats {
        self.counters.snapshot(StatsContext {
            state: self.lifecycle.current(),
            workers: self.workers.len(),
            in_flight: self.pool.in_flight(),
            available_slots: self.pool.available_slots(),
            max_concurrency: self.pool.capacity(),
            started_at: *self.started_at.lock(),
        })
    }

    /// Names of the configured workers, in configuration order
    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.iter().map(Worker::name).collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    /// Number of poll loops that have not exited yet
    pub fn live_loops(&self) -> usize {
        self.lifecycle.live_loops()
    }
}

impl<T> Drop for Engine<T> {
    fn drop(&mut self) {
        // Poll loops hold their own handles; without this they would outlive
        // the engine.
        if self.lifecycle.request_shutdown().is_some() {
            self.pool.close();
            debug!(engine_id = %self.engine_id, "Engine dropped while running, shutdown requested");
        }
    }
}

impl<T> fmt::Debug for Engine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("engine_id", &self.engine_id)
            .field("workers", &self.worker_names())
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}
