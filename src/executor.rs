//! Task executor facade
//!
//! Composes the chunk producer, retry engine, worker pool, and cancellation
//! hierarchy into three processing modes plus the outbound-call variant:
//!
//! - [`process_with_retry`](TaskExecutor::process_with_retry) - the whole
//!   sequence as one retried operation
//! - [`process_in_batches`](TaskExecutor::process_in_batches) - ordered
//!   batches, each retried under its own timeout
//! - [`process_concurrently`](TaskExecutor::process_concurrently) - bounded
//!   worker pool
//! - [`call_remote`](TaskExecutor::call_remote) - a single outbound request
//!   through an injected client
//!
//! Every operation derives a bounded child scope from the caller's scope,
//! allocates a correlation identifier once, attaches it to any surfaced
//! error, and reports start/end/retry/cancellation to the injected sink.

use crate::chunk::chunked;
use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::pool::run_pool;
use crate::remote::RemoteCaller;
use crate::retry::retry_with_backoff;
use crate::scope::CancelScope;
use crate::sink::{LogSink, TracingSink};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::Level;

/// Per-call context: an optional pre-existing scope and/or correlation id
///
/// With `scope` unset the operation runs under a fresh root scope; with
/// `correlation_id` unset a new identifier is generated for the call.
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    /// Caller-supplied cancellation scope the operation is derived from
    pub scope: Option<CancelScope>,
    /// Caller-supplied correlation identifier
    pub correlation_id: Option<String>,
}

/// Bounded-concurrency task executor
///
/// Holds validated configuration and the injected logging sink. Cloneable-by
/// sharing is not needed: the executor borrows itself for the duration of one
/// call and owns no background state between calls.
pub struct TaskExecutor {
    config: ExecutorConfig,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TaskExecutor {
    /// Create an executor with a validated configuration and logging sink
    ///
    /// Configuration errors are reported here, before any work is accepted.
    pub fn new(config: ExecutorConfig, sink: Arc<dyn LogSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, sink })
    }

    /// Create an executor with default configuration, logging via `tracing`
    pub fn with_defaults() -> Self {
        Self {
            config: ExecutorConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// The executor's configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Process the entire sequence as a single retried operation
    ///
    /// Items are processed sequentially in input order; any failure makes the
    /// whole pass eligible for retry (items must be `Clone` so a retry can
    /// replay them). Runs under an overall timeout derived from the caller's
    /// scope.
    pub async fn process_with_retry<T, F, Fut>(
        &self,
        items: Vec<T>,
        op: F,
        ctx: RunContext,
    ) -> Result<()>
    where
        T: Clone,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let (scope, correlation_id) = self.begin(ctx, "process_with_retry");
        let items = &items;
        let op = &op;
        let scope_ref = &scope;

        let result = retry_with_backoff(
            &self.config.retry,
            &scope,
            self.sink.as_ref(),
            move || async move {
                for item in items.iter() {
                    if let Some(err) = scope_ref.done_reason() {
                        return Err(err);
                    }
                    op(item.clone()).await?;
                }
                Ok(())
            },
        )
        .await;

        self.finish("process_with_retry", correlation_id, result)
    }

    /// Process items in fixed-size batches, strictly in input order
    ///
    /// Each batch's item-processing runs through the retry engine under a
    /// fresh per-batch timeout; a batch failure aborts all remaining batches.
    /// No batch starts before the previous batch's retry loop terminates.
    pub async fn process_in_batches<T, F, Fut>(
        &self,
        items: Vec<T>,
        op: F,
        ctx: RunContext,
    ) -> Result<()>
    where
        T: Clone,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let (scope, correlation_id) = self.begin(ctx, "process_in_batches");
        let result = self.run_batches(items, &op, &scope).await;
        self.finish("process_in_batches", correlation_id, result)
    }

    async fn run_batches<T, F, Fut>(&self, items: Vec<T>, op: &F, scope: &CancelScope) -> Result<()>
    where
        T: Clone,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let batches = chunked(items, self.config.chunk_size)?;

        for (batch_index, batch) in batches.enumerate() {
            if let Some(err) = scope.done_reason() {
                return Err(err);
            }

            self.sink.log(
                Level::DEBUG,
                "processing batch",
                &[
                    ("batch", json!(batch_index)),
                    ("len", json!(batch.len())),
                ],
            );

            let batch_scope = scope.child(self.config.batch_timeout);
            let batch_ref = &batch;
            let batch_scope_ref = &batch_scope;

            retry_with_backoff(
                &self.config.retry,
                &batch_scope,
                self.sink.as_ref(),
                move || async move {
                    for item in batch_ref.iter() {
                        if let Some(err) = batch_scope_ref.done_reason() {
                            return Err(err);
                        }
                        op(item.clone()).await?;
                    }
                    Ok(())
                },
            )
            .await?;
        }

        Ok(())
    }

    /// Process items concurrently on the configured worker pool
    ///
    /// Delegates to the bounded worker pool under an overall timeout derived
    /// from the caller's scope, with the configured per-item timeout.
    pub async fn process_concurrently<T, F, Fut>(
        &self,
        items: Vec<T>,
        op: F,
        ctx: RunContext,
    ) -> Result<()>
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (scope, correlation_id) = self.begin(ctx, "process_concurrently");
        let result = run_pool(
            items,
            self.config.workers,
            &scope,
            self.config.item_timeout,
            Arc::clone(&self.sink),
            op,
        )
        .await;
        self.finish("process_concurrently", correlation_id, result)
    }

    /// Issue a single outbound request through the injected client
    ///
    /// The request runs under the retry engine and the caller's scope; the
    /// client is responsible for not outliving the scope (see
    /// [`RemoteCaller`]).
    pub async fn call_remote(&self, caller: &dyn RemoteCaller, ctx: RunContext) -> Result<()> {
        let (scope, correlation_id) = self.begin(ctx, "call_remote");
        let scope_ref = &scope;

        let result = retry_with_backoff(&self.config.retry, &scope, self.sink.as_ref(), move || {
            caller.call(scope_ref)
        })
        .await;

        self.finish("call_remote", correlation_id, result)
    }

    /// Derive the operation scope and allocate the correlation identifier
    fn begin(&self, ctx: RunContext, operation: &str) -> (CancelScope, String) {
        let scope = ctx
            .scope
            .unwrap_or_else(CancelScope::root)
            .child(self.config.overall_timeout);
        let correlation_id = ctx
            .correlation_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        self.sink.log(
            Level::INFO,
            "operation started",
            &[
                ("operation", json!(operation)),
                ("correlation_id", json!(&correlation_id)),
            ],
        );

        (scope, correlation_id)
    }

    /// Attach the correlation identifier and report the outcome
    fn finish(&self, operation: &str, correlation_id: String, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.sink.log(
                    Level::INFO,
                    "operation completed",
                    &[
                        ("operation", json!(operation)),
                        ("correlation_id", json!(&correlation_id)),
                    ],
                );
                Ok(())
            }
            Err(err) => {
                let err = err.with_correlation_id(correlation_id);
                let level = if err.is_cancellation() {
                    Level::WARN
                } else {
                    Level::ERROR
                };
                self.sink.log(
                    level,
                    "operation failed",
                    &[
                        ("operation", json!(operation)),
                        ("correlation_id", json!(&err.correlation_id)),
                        ("code", json!(&err.code)),
                        ("retryable", json!(err.retryable)),
                    ],
                );
                Err(err)
            }
        }
    }
}
