//! Injected logging sink
//!
//! The execution core emits structured events (operation start/end, retry
//! attempts, cancellation) to a sink supplied by the caller instead of a
//! process-global logger, so embedders control the lifecycle and tests can
//! capture or silence output. A sink must never block its caller and never
//! surfaces errors to the core.

use serde_json::Value;
use tracing::Level;

/// Structured logging sink injected into the executor
///
/// Implementations receive a level, a message, and a set of key/value
/// attributes. They must return quickly and must not panic; the core treats
/// logging as infallible.
pub trait LogSink: Send + Sync {
    /// Record one event
    fn log(&self, level: Level, message: &str, fields: &[(&str, Value)]);
}

/// Sink that forwards events to the `tracing` ecosystem
///
/// This is the default sink: embedders that already install a
/// `tracing_subscriber` get taskpool events alongside their own.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str, fields: &[(&str, Value)]) {
        // tracing macros require a const level, so dispatch per variant
        match level {
            Level::TRACE => tracing::trace!(fields = ?fields, "{message}"),
            Level::DEBUG => tracing::debug!(fields = ?fields, "{message}"),
            Level::INFO => tracing::info!(fields = ?fields, "{message}"),
            Level::WARN => tracing::warn!(fields = ?fields, "{message}"),
            Level::ERROR => tracing::error!(fields = ?fields, "{message}"),
        }
    }
}

/// Sink that discards every event
///
/// Useful in tests and in embedders that do their own reporting at the call
/// site.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _level: Level, _message: &str, _fields: &[(&str, Value)]) {}
}
