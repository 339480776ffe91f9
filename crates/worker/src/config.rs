//! Process configuration

use std::time::Duration;

use anyhow::{bail, Result};
use drover_engine::EngineConfig;

/// Worker process configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Worker names, one poll loop each
    pub workers: Vec<String>,
    /// Demo tasks seeded per worker at startup
    pub demo_tasks: usize,
    /// How long shutdown waits for in-flight tasks
    pub drain_timeout: Duration,
    /// How long a delivered demo task stays hidden from further polls
    pub lease: Duration,
    pub engine: EngineConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: vec!["default".to_string()],
            demo_tasks: 5,
            drain_timeout: Duration::from_secs(30),
            lease: Duration::from_secs(30),
            engine: EngineConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `DROVER_WORKERS`: Comma-separated worker names (default: "default")
    /// - `DROVER_DEMO_TASKS`: Tasks seeded per worker (default: 5)
    /// - `DROVER_DRAIN_TIMEOUT_MS`: Shutdown drain limit (default: 30000)
    /// - `DROVER_LEASE_MS`: Demo source lease (default: 30000)
    /// - plus everything [`EngineConfig::from_env`] reads
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let workers = match std::env::var("DROVER_WORKERS") {
            Ok(raw) => parse_workers(&raw)?,
            Err(_) => defaults.workers,
        };

        let demo_tasks = std::env::var("DROVER_DEMO_TASKS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.demo_tasks);

        let drain_timeout = std::env::var("DROVER_DRAIN_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.drain_timeout);

        let lease = std::env::var("DROVER_LEASE_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.lease);

        let engine = EngineConfig::from_env();
        engine.validate()?;

        Ok(Self {
            workers,
            demo_tasks,
            drain_timeout,
            lease,
            engine,
        })
    }
}

/// Split a comma-separated list of worker names
///
/// Blank entries are skipped; an empty result is an error.
pub fn parse_workers(raw: &str) -> Result<Vec<String>> {
    let workers: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();

    if workers.is_empty() {
        bail!("DROVER_WORKERS names no workers: {raw:?}");
    }
    Ok(workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers() {
        assert_eq!(
            parse_workers("emails, reports ,,thumbnails").unwrap(),
            vec!["emails", "reports", "thumbnails"]
        );
    }

    #[test]
    fn test_parse_workers_rejects_empty_list() {
        assert!(parse_workers("").is_err());
        assert!(parse_workers(" , ,").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.workers, vec!["default"]);
        assert_eq!(config.demo_tasks, 5);
        assert_eq!(config.drain_timeout, Duration::from_secs(30));
        assert_eq!(config.lease, Duration::from_secs(30));
        assert_eq!(config.engine.max_concurrency, 10);
    }
}
