//! Configuration types for taskpool
//!
//! Retry policy, worker count, and chunk size are plain configuration values
//! supplied by the embedding application (taskpool never parses files or
//! environment variables itself). Every record derives serde so callers can
//! load it from whatever source they already use, with sensible defaults for
//! omitted fields.

use crate::error::{Result, TaskError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Component name used for configuration errors
const COMPONENT: &str = "config";

/// Exponential-backoff retry policy
///
/// Intervals grow by `multiplier` after each failed attempt, capped at
/// `max_interval`, with symmetric jitter of `randomization_factor` applied to
/// each computed interval. The loop terminates once the cumulative elapsed
/// time would exceed `max_elapsed_time`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry (default: 500 ms)
    #[serde(default = "default_initial_interval", with = "duration_ms_serde")]
    pub initial_interval: Duration,

    /// Upper bound on any single backoff interval (default: 60 seconds)
    #[serde(default = "default_max_interval", with = "duration_ms_serde")]
    pub max_interval: Duration,

    /// Total time budget across all attempts (default: 15 minutes)
    ///
    /// A budget of zero means "at most one attempt, no retries".
    #[serde(default = "default_max_elapsed_time", with = "duration_ms_serde")]
    pub max_elapsed_time: Duration,

    /// Growth factor applied to the interval after each failure (default: 1.5)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Jitter fraction applied symmetrically to each interval (default: 0.5)
    ///
    /// An interval `i` is perturbed to a uniform value in
    /// `[i * (1 - factor), i * (1 + factor)]`.
    #[serde(default = "default_randomization_factor")]
    pub randomization_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: default_initial_interval(),
            max_interval: default_max_interval(),
            max_elapsed_time: default_max_elapsed_time(),
            multiplier: default_multiplier(),
            randomization_factor: default_randomization_factor(),
        }
    }
}

impl RetryPolicy {
    /// Validate the policy, reporting the first invalid field
    ///
    /// Called before the first attempt of any retry loop; an invalid policy is
    /// a configuration error and is never partially applied.
    pub fn validate(&self) -> Result<()> {
        if self.initial_interval.is_zero() {
            return Err(TaskError::invalid_config(
                COMPONENT,
                "retry.initial_interval must be greater than zero",
            ));
        }
        if self.multiplier < 1.0 {
            return Err(TaskError::invalid_config(
                COMPONENT,
                format!(
                    "retry.multiplier must be at least 1.0, got {}",
                    self.multiplier
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(TaskError::invalid_config(
                COMPONENT,
                format!(
                    "retry.randomization_factor must be within [0.0, 1.0], got {}",
                    self.randomization_factor
                ),
            ));
        }
        if self.max_interval < self.initial_interval {
            return Err(TaskError::invalid_config(
                COMPONENT,
                "retry.max_interval must not be smaller than retry.initial_interval",
            ));
        }
        Ok(())
    }
}

/// Executor configuration (pool sizing, chunking, timeouts)
///
/// Groups the knobs for all three processing modes. Used as-is by
/// [`TaskExecutor`](crate::executor::TaskExecutor); validated once at
/// construction, before any work is accepted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Number of concurrent workers for `process_concurrently` (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Batch length for `process_in_batches` (default: 16)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Retry policy applied by the retrying processing modes
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Overall timeout for one facade call (None = bounded only by the caller's scope)
    #[serde(default, with = "optional_duration_ms_serde")]
    pub overall_timeout: Option<Duration>,

    /// Per-batch timeout for `process_in_batches` (None = no per-batch deadline)
    #[serde(default, with = "optional_duration_ms_serde")]
    pub batch_timeout: Option<Duration>,

    /// Per-item timeout for `process_concurrently` (None = no per-item deadline)
    #[serde(default, with = "optional_duration_ms_serde")]
    pub item_timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            chunk_size: default_chunk_size(),
            retry: RetryPolicy::default(),
            overall_timeout: None,
            batch_timeout: None,
            item_timeout: None,
        }
    }
}

impl ExecutorConfig {
    /// Validate pool parameters and the nested retry policy
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TaskError::invalid_config(
                COMPONENT,
                "workers must be at least 1",
            ));
        }
        if self.chunk_size == 0 {
            return Err(TaskError::invalid_config(
                COMPONENT,
                "chunk_size must be at least 1",
            ));
        }
        self.retry.validate()
    }
}

fn default_initial_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_max_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_max_elapsed_time() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_randomization_factor() -> f64 {
    0.5
}

fn default_workers() -> usize {
    4
}

fn default_chunk_size() -> usize {
    16
}

// Duration serialization helper (integer milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper (integer milliseconds)
mod optional_duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
