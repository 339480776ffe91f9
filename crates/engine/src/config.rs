//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Engine configuration
///
/// All values are fixed at construction; the engine never changes them at
/// runtime. Poll-loop concurrency is always one per worker, so only the
/// execution pool capacity is tunable.
///
/// # Example
///
/// ```
/// use drover_engine::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::default()
///     .with_poll_interval(Duration::from_secs(2))
///     .with_max_concurrency(4)
///     .with_task_timeout(Duration::from_secs(30));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay between the end of one poll tick and the start of the next
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// Number of execution slots shared by all workers
    pub max_concurrency: usize,

    /// Per-task deadline (None = executions may run indefinitely)
    #[serde(default, with = "option_duration_millis")]
    pub task_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_concurrency: 10,
            task_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `DROVER_POLL_INTERVAL_MS`: poll interval in milliseconds (default: 10000)
    /// - `DROVER_MAX_CONCURRENCY`: execution pool capacity (default: 10)
    /// - `DROVER_TASK_TIMEOUT_MS`: per-task deadline in milliseconds (default: none)
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let poll_interval = env_millis("DROVER_POLL_INTERVAL_MS").unwrap_or(defaults.poll_interval);

        let max_concurrency = std::env::var("DROVER_MAX_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_concurrency);

        Self {
            poll_interval,
            max_concurrency,
            task_timeout: env_millis("DROVER_TASK_TIMEOUT_MS"),
        }
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the execution pool capacity
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Set the per-task deadline
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Remove the per-task deadline
    pub fn without_task_timeout(mut self) -> Self {
        self.task_timeout = None;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.poll_interval.is_zero() {
            return Err(EngineError::InvalidConfig(
                "poll_interval must be greater than zero".into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.task_timeout.is_some_and(|t| t.is_zero()) {
            return Err(EngineError::InvalidConfig(
                "task_timeout must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration
            .map(|d| d.as_millis() as u64)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
