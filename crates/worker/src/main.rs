use std::sync::Arc;

use anyhow::{Context, Result};
use drover_engine::{Engine, InMemoryTaskSource, Worker};
use drover_worker::{demo, init_telemetry, DemoExecutor, TelemetryConfig, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Configure via environment variables:
    // - RUST_LOG or LOG_LEVEL: Log filter (default: "drover_engine=info,drover_worker=info")
    // - DROVER_*: see WorkerConfig::from_env and EngineConfig::from_env
    let telemetry_config = TelemetryConfig::from_env();
    init_telemetry(&telemetry_config)?;

    tracing::info!("drover-worker starting...");

    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;

    tracing::info!(
        workers = ?config.workers,
        poll_interval_ms = config.engine.poll_interval.as_millis() as u64,
        max_concurrency = config.engine.max_concurrency,
        demo_tasks = config.demo_tasks,
        "Starting engine"
    );

    let source = Arc::new(InMemoryTaskSource::new().with_lease(config.lease));
    demo::seed(&source, &config.workers, config.demo_tasks);

    let workers = config
        .workers
        .iter()
        .map(|name| Worker::new(name.clone(), DemoExecutor::new(name.clone())))
        .collect();

    let engine = Engine::new(Arc::clone(&source), workers, config.engine.clone())
        .context("Failed to create engine")?;
    engine.start().context("Failed to start engine")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Received shutdown signal");

    if let Err(e) = engine.shutdown_and_drain(config.drain_timeout).await {
        tracing::warn!(error = %e, "Shutdown did not drain cleanly");
    }

    let stats = engine.stats();
    tracing::info!(
        succeeded = stats.tasks_succeeded,
        failed = stats.tasks_failed,
        outstanding = source.outstanding_count(),
        "Worker shutdown complete"
    );
    Ok(())
}
