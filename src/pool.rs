//! Bounded worker pool
//!
//! Distributes an ordered item sequence across a fixed number of concurrent
//! workers draining a shared queue. Every item is delivered to exactly one
//! worker; the first observed error wins a write-once slot and cancels the
//! pool's derived scope so in-flight and queued work stops promptly. The call
//! joins every worker before returning, so no background work survives it.
//!
//! Completion order across items is unspecified; only submission order into
//! the queue is deterministic.

use crate::error::{Result, Severity, TaskError};
use crate::scope::CancelScope;
use crate::sink::LogSink;
use serde_json::json;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::Level;

/// Component name used for pool errors
const COMPONENT: &str = "pool";

/// Process every item with a fixed number of concurrent workers
///
/// Spawns `min(workers, items.len())` tokio tasks that drain the queue in
/// submission order, each running `op` for one item at a time under an
/// optional per-item timeout derived from the pool's scope.
///
/// Returns `Ok(())` once every item has been processed without error.
/// On the first error the pool cancels its derived scope, waits for the
/// remaining workers to stop, and returns that error; errors that lose the
/// race are reported to `sink` at debug level and discarded. If the caller's
/// scope becomes done before any item error, the scope's cancellation error
/// is returned instead.
///
/// A worker count of zero is rejected before any work begins.
pub async fn run_pool<T, F, Fut>(
    items: Vec<T>,
    workers: usize,
    scope: &CancelScope,
    item_timeout: Option<Duration>,
    sink: Arc<dyn LogSink>,
    op: F,
) -> Result<()>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    if workers == 0 {
        return Err(TaskError::invalid_config(
            COMPONENT,
            "worker count must be at least 1",
        ));
    }
    if items.is_empty() {
        return Ok(());
    }

    let total = items.len();
    let pool_scope = scope.child(None);
    let queue: Arc<Mutex<VecDeque<(usize, T)>>> =
        Arc::new(Mutex::new(items.into_iter().enumerate().collect()));
    let first_error: Arc<OnceLock<TaskError>> = Arc::new(OnceLock::new());
    let op = Arc::new(op);

    let worker_count = workers.min(total);
    let mut handles = Vec::with_capacity(worker_count);

    for _ in 0..worker_count {
        let queue = Arc::clone(&queue);
        let first_error = Arc::clone(&first_error);
        let op = Arc::clone(&op);
        let pool_scope = pool_scope.clone();
        let sink = Arc::clone(&sink);

        handles.push(tokio::spawn(async move {
            loop {
                if pool_scope.is_done() {
                    break;
                }

                // Exactly-once delivery: the mutex guards the single pop
                let next = { queue.lock().await.pop_front() };
                let Some((index, item)) = next else { break };

                let item_scope = pool_scope.child(item_timeout);
                let result = tokio::select! {
                    res = op(item) => res,
                    _ = item_scope.done() => Err(item_scope
                        .done_reason()
                        .unwrap_or_else(|| TaskError::cancelled(COMPONENT))),
                };

                if let Err(err) = result {
                    // Only the first error is reported; losers are logged and dropped
                    if let Err(discarded) = first_error.set(err) {
                        sink.log(
                            Level::DEBUG,
                            "error discarded, another worker reported first",
                            &[
                                ("item", json!(index)),
                                ("error", json!(discarded.to_string())),
                            ],
                        );
                    }
                    pool_scope.cancel();
                    break;
                }
            }
        }));
    }

    // Join every worker; the pool never leaves orphaned tasks behind
    for join_result in futures::future::join_all(handles).await {
        if let Err(join_err) = join_result {
            sink.log(
                Level::ERROR,
                "worker task panicked",
                &[("error", json!(join_err.to_string()))],
            );
            let _ = first_error.set(
                TaskError::permanent(COMPONENT, format!("worker task panicked: {join_err}"))
                    .with_severity(Severity::Critical),
            );
            pool_scope.cancel();
        }
    }

    if let Some(err) = first_error.get() {
        return Err(err.clone());
    }

    // Items left in the queue mean the workers bailed out on a done scope
    let leftovers = queue.lock().await.len();
    if leftovers > 0 {
        return Err(pool_scope
            .done_reason()
            .unwrap_or_else(|| TaskError::cancelled(COMPONENT)));
    }

    Ok(())
}
