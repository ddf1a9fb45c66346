//! # taskpool
//!
//! Bounded-concurrency task execution core for async Rust applications.
//!
//! ## Design Philosophy
//!
//! taskpool is designed to be:
//! - **Bounded** - A fixed worker count and explicit timeouts at every level
//! - **Cancellation-correct** - One scope tree; every wait races against it
//! - **Failure-aware** - Transient failures retry with backoff, permanent ones surface immediately
//! - **Library-first** - No CLI or global state, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskpool::{ExecutorConfig, RunContext, TaskExecutor, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), taskpool::TaskError> {
//!     let executor = TaskExecutor::new(ExecutorConfig::default(), Arc::new(TracingSink))?;
//!
//!     executor
//!         .process_concurrently(
//!             vec!["alpha", "beta", "gamma"],
//!             |name| async move {
//!                 println!("processing {name}");
//!                 Ok(())
//!             },
//!             RunContext::default(),
//!         )
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Processing Modes
//!
//! - [`TaskExecutor::process_with_retry`] - the whole sequence as one retried operation
//! - [`TaskExecutor::process_in_batches`] - fixed-size batches, in order, each retried under its own timeout
//! - [`TaskExecutor::process_concurrently`] - a bounded pool of concurrent workers
//! - [`TaskExecutor::call_remote`] - a single outbound request through an injected client

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Lazy batch production
pub mod chunk;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Task executor facade
pub mod executor;
/// Bounded worker pool
pub mod pool;
/// Outbound network call collaborator
pub mod remote;
/// Retry logic with exponential backoff
pub mod retry;
/// Hierarchical cancellation scopes
pub mod scope;
/// Injected logging sink
pub mod sink;

// Re-export commonly used types
pub use chunk::{Chunks, chunked};
pub use config::{ExecutorConfig, RetryPolicy};
pub use error::{Result, Severity, TaskError, code};
pub use executor::{RunContext, TaskExecutor};
pub use pool::run_pool;
pub use remote::{HttpCaller, RemoteCaller};
pub use retry::{Backoff, retry, retry_with_backoff};
pub use scope::CancelScope;
pub use sink::{LogSink, NoopSink, TracingSink};
