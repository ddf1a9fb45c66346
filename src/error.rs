//! Error types for taskpool
//!
//! This module provides the structured error record surfaced by every fallible
//! operation in the library, including:
//! - Machine-readable error codes for programmatic handling
//! - A `retryable` flag that drives the retry engine's classification
//! - Severity levels for operator alerting
//! - Correlation identifiers for cross-component tracing

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for taskpool operations
pub type Result<T> = std::result::Result<T, TaskError>;

/// Machine-readable error codes attached to [`TaskError`]
///
/// Clients can match on these for programmatic error handling instead of
/// parsing messages.
pub mod code {
    /// Invalid policy, pool, or chunk configuration (detected before any work)
    pub const INVALID_CONFIG: &str = "invalid_config";
    /// A cancellation scope was explicitly cancelled
    pub const CANCELLED: &str = "cancelled";
    /// A cancellation scope's deadline elapsed
    pub const DEADLINE_EXCEEDED: &str = "deadline_exceeded";
    /// The retry budget was exhausted without a successful attempt
    pub const RETRIES_EXHAUSTED: &str = "retries_exhausted";
    /// An item-processing operation failed
    pub const OPERATION_FAILED: &str = "operation_failed";
    /// An outbound request completed with a non-success HTTP status
    pub const REMOTE_STATUS: &str = "remote_status";
    /// An outbound request failed at the transport level
    pub const REMOTE_TRANSPORT: &str = "remote_transport";
}

/// Severity of an error, for operator alerting decisions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; no action needed
    Info,
    /// Degraded but recovering (e.g. a retry in progress)
    Warning,
    /// Operation failed
    #[default]
    Error,
    /// Operation failed and manual intervention is likely required
    Critical,
}

/// Structured error record for taskpool operations
///
/// Every failed call returns exactly one `TaskError`. The record carries
/// enough structure for the caller to decide whether to re-invoke (check
/// [`retryable`](TaskError::retryable)) or alert an operator (check
/// [`severity`](TaskError::severity)).
///
/// Once `retryable` is `false`, the retry engine performs no further attempts
/// for that error, regardless of remaining elapsed-time budget.
#[derive(Clone, Debug, Error, Serialize, Deserialize)]
#[error("[{component}] {code}: {message}")]
pub struct TaskError {
    /// Machine-readable error code (see [`code`])
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Name of the component the error originated from (e.g. "pool", "retry")
    pub component: String,

    /// Opaque token tying together all errors/events of one logical operation
    ///
    /// Empty until the orchestrator attaches the operation's identifier.
    #[serde(default)]
    pub correlation_id: String,

    /// Severity level for alerting decisions
    #[serde(default)]
    pub severity: Severity,

    /// Whether the retry engine may attempt the operation again
    #[serde(default)]
    pub retryable: bool,
}

impl TaskError {
    /// Create an error with an explicit code and component
    pub fn new(
        code: impl Into<String>,
        component: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            component: component.into(),
            correlation_id: String::new(),
            severity: Severity::Error,
            retryable: false,
        }
    }

    /// Create a configuration error (always fatal, never retried)
    pub fn invalid_config(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code::INVALID_CONFIG, component, message)
    }

    /// Create an explicit-cancellation error (terminal, never retried)
    pub fn cancelled(component: impl Into<String>) -> Self {
        Self::new(code::CANCELLED, component, "operation cancelled")
    }

    /// Create a deadline-elapsed error (terminal, never retried)
    pub fn deadline_exceeded(component: impl Into<String>) -> Self {
        Self::new(code::DEADLINE_EXCEEDED, component, "deadline exceeded")
    }

    /// Create a transient operational error (eligible for retry)
    pub fn transient(component: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new(code::OPERATION_FAILED, component, message);
        err.retryable = true;
        err.severity = Severity::Warning;
        err
    }

    /// Create a permanent operational error (surfaced immediately, never retried)
    pub fn permanent(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code::OPERATION_FAILED, component, message)
    }

    /// Wrap the last error of an exhausted retry loop
    ///
    /// The wrapped error's message is preserved; the result is never retryable.
    pub fn retries_exhausted(attempts: u32, last: &TaskError) -> Self {
        let mut err = Self::new(
            code::RETRIES_EXHAUSTED,
            "retry",
            format!("retries exhausted after {} attempts: {}", attempts, last.message),
        );
        err.severity = last.severity.max(Severity::Error);
        err
    }

    /// Set the severity level
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Mark the error as retryable or permanent
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attach the correlation identifier of the surrounding operation
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Whether this error represents scope cancellation (explicit or deadline)
    pub fn is_cancellation(&self) -> bool {
        self.code == code::CANCELLED || self.code == code::DEADLINE_EXCEEDED
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        let err = TaskError::transient("pool", "connection reset");
        assert!(err.retryable);
        assert_eq!(err.code, code::OPERATION_FAILED);
        assert_eq!(err.severity, Severity::Warning);
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        let err = TaskError::permanent("pool", "unprocessable item");
        assert!(!err.retryable);
    }

    #[test]
    fn cancellation_codes_are_recognized() {
        assert!(TaskError::cancelled("scope").is_cancellation());
        assert!(TaskError::deadline_exceeded("scope").is_cancellation());
        assert!(!TaskError::permanent("pool", "boom").is_cancellation());
    }

    #[test]
    fn retries_exhausted_preserves_last_message_and_is_permanent() {
        let last = TaskError::transient("remote", "503 service unavailable");
        let err = TaskError::retries_exhausted(4, &last);
        assert_eq!(err.code, code::RETRIES_EXHAUSTED);
        assert!(!err.retryable, "exhaustion must stop further retries");
        assert!(err.message.contains("503 service unavailable"));
        assert!(err.message.contains("4 attempts"));
    }

    #[test]
    fn correlation_id_is_attached_by_builder() {
        let err = TaskError::permanent("pool", "boom").with_correlation_id("op-123");
        assert_eq!(err.correlation_id, "op-123");
    }

    #[test]
    fn display_includes_component_and_code() {
        let err = TaskError::invalid_config("config", "workers must be >= 1");
        let rendered = err.to_string();
        assert!(rendered.contains("config"));
        assert!(rendered.contains("invalid_config"));
        assert!(rendered.contains("workers must be >= 1"));
    }

    #[test]
    fn severity_serializes_as_snake_case() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
