//! Retry logic with exponential backoff
//!
//! This module wraps fallible async operations with configurable retry logic
//! for transient failures. It implements exponential backoff with symmetric
//! jitter to prevent thundering herd, bounded by a total elapsed-time budget,
//! and observes a [`CancelScope`] at every suspension point.
//!
//! Permanent failures (errors with `retryable == false`) and scope
//! cancellation short-circuit the loop immediately; only transient failures
//! are retried.

use crate::config::RetryPolicy;
use crate::error::{Result, TaskError};
use crate::scope::CancelScope;
use crate::sink::LogSink;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Level;

/// Per-invocation retry state: current interval, elapsed time, attempt count
///
/// Owned by exactly one retry loop and dropped when it terminates. The jitter
/// source is injectable via [`Backoff::with_rng`] so tests can substitute a
/// seeded generator for reproducible delays.
pub struct Backoff {
    policy: RetryPolicy,
    current: Duration,
    started: Instant,
    attempts: u32,
    rng: StdRng,
}

impl Backoff {
    /// Create backoff state for one retry loop, seeded from OS entropy
    pub fn new(policy: &RetryPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }

    /// Create backoff state with an explicit jitter source
    pub fn with_rng(policy: &RetryPolicy, rng: StdRng) -> Self {
        Self {
            policy: policy.clone(),
            current: policy.initial_interval,
            started: Instant::now(),
            attempts: 1,
            rng,
        }
    }

    /// Number of attempts made so far (the initial attempt counts as 1)
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Compute the delay before the next attempt, or `None` once the
    /// elapsed-time budget is spent
    ///
    /// The returned delay is the current interval with jitter applied; the
    /// stored interval then grows by the policy multiplier, capped at
    /// `max_interval`. Returns `None` when waiting the jittered delay would
    /// push cumulative elapsed time past `max_elapsed_time`, so a budget of
    /// zero permits no retries at all.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = self.jitter(self.current);
        if self.started.elapsed() + delay > self.policy.max_elapsed_time {
            return None;
        }
        self.attempts += 1;
        self.current = self
            .current
            .mul_f64(self.policy.multiplier)
            .min(self.policy.max_interval);
        Some(delay)
    }

    /// Perturb an interval to a uniform value in `interval * (1 ± factor)`
    fn jitter(&mut self, interval: Duration) -> Duration {
        let factor = self.policy.randomization_factor;
        if factor == 0.0 {
            return interval;
        }
        let delta = factor * (2.0 * self.rng.r#gen::<f64>() - 1.0);
        Duration::from_secs_f64((interval.as_secs_f64() * (1.0 + delta)).max(0.0))
    }
}

/// Execute an async operation with exponential-backoff retry
///
/// Validates the policy before the first attempt, then retries transient
/// failures until one of the terminal conditions is reached:
///
/// - the operation succeeds (result returned immediately);
/// - the error is permanent (`retryable == false`): surfaced unchanged;
/// - the scope becomes done: the scope's cancellation error is surfaced and
///   no further attempt is made, even mid-backoff-wait;
/// - the elapsed-time budget is spent: the last error is surfaced wrapped as
///   `retries_exhausted`.
///
/// Each retry is reported to `sink` with the attempt number and delay.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    scope: &CancelScope,
    sink: &dyn LogSink,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    policy.validate()?;
    retry(Backoff::new(policy), scope, sink, operation).await
}

/// Like [`retry_with_backoff`], but with caller-supplied backoff state
///
/// Lets tests drive the loop with a deterministic jitter source.
pub async fn retry<F, Fut, T>(
    mut backoff: Backoff,
    scope: &CancelScope,
    sink: &dyn LogSink,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    loop {
        // A scope that is already done never gets another attempt
        if let Some(scope_err) = scope.done_reason() {
            return Err(scope_err);
        }

        match operation().await {
            Ok(value) => {
                if backoff.attempts() > 1 {
                    sink.log(
                        Level::INFO,
                        "operation succeeded after retry",
                        &[("attempts", json!(backoff.attempts()))],
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                // Cancellation observed after a failure is terminal, not retried
                if let Some(scope_err) = scope.done_reason() {
                    return Err(scope_err);
                }
                if !err.retryable {
                    return Err(err);
                }

                let Some(delay) = backoff.next_delay() else {
                    return Err(TaskError::retries_exhausted(backoff.attempts(), &err));
                };

                sink.log(
                    Level::WARN,
                    "operation failed, retrying",
                    &[
                        ("attempt", json!(backoff.attempts())),
                        ("delay_ms", json!(delay.as_millis() as u64)),
                        ("error", json!(err.to_string())),
                    ],
                );

                // The wait itself must never outlive the scope
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = scope.done() => {
                        return Err(scope
                            .done_reason()
                            .unwrap_or_else(|| TaskError::cancelled("scope")));
                    }
                }
            }
        }
    }
}
