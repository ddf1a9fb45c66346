//! Tests for executor-level concurrency and cancellation behavior
//!
//! These tests drive the public facade end-to-end and verify that:
//! - Worker-pool processing actually runs items in parallel
//! - Top-level cancellation cuts through every layer within a bounded delay
//! - Retry budgets bound wall-clock time for persistently failing operations
//! - Batched processing respects strict batch ordering
//!
//! Timing assertions use generous upper bounds to tolerate CI scheduling
//! overhead; the lower bounds are what demonstrate the behavior.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use taskpool::{
    CancelScope, ExecutorConfig, NoopSink, RetryPolicy, RunContext, TaskError, TaskExecutor, code,
};
use tokio_test::assert_ok;

/// Helper to build an executor with short retry intervals and the given knobs
fn build_executor(config: ExecutorConfig) -> TaskExecutor {
    TaskExecutor::new(config, Arc::new(NoopSink)).expect("test config must be valid")
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(100),
        max_elapsed_time: Duration::from_secs(2),
        multiplier: 2.0,
        randomization_factor: 0.0,
    }
}

#[tokio::test]
async fn five_items_on_three_workers_take_two_waves_not_five() {
    let executor = build_executor(ExecutorConfig {
        workers: 3,
        retry: fast_retry(),
        ..Default::default()
    });

    let start = Instant::now();
    assert_ok!(
        executor
            .process_concurrently(
                (0..5u32).collect(),
                |_| async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(())
                },
                RunContext::default(),
            )
            .await
    );

    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(190),
        "⌈5/3⌉ waves of 100ms each need at least ~200ms, took {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(450),
        "3 workers must not serialize 5 items into 500ms, took {elapsed:?}"
    );
}

#[tokio::test]
async fn cancelling_top_level_scope_early_surfaces_cancellation_promptly() {
    let executor = build_executor(ExecutorConfig {
        workers: 2,
        retry: fast_retry(),
        ..Default::default()
    });

    let scope = CancelScope::root();
    let canceller = scope.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let err = executor
        .process_concurrently(
            (0..4u32).collect(),
            |_| async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            },
            RunContext {
                scope: Some(scope),
                correlation_id: None,
            },
        )
        .await
        .expect_err("cancellation must fail the call");

    assert_eq!(
        err.code,
        code::CANCELLED,
        "an explicit cancel must surface as cancellation, not as a downstream timeout"
    );
    assert!(
        start.elapsed() < Duration::from_millis(300),
        "cancellation must surface within a small bounded delay, took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn persistent_failures_exhaust_the_retry_budget_quickly() {
    // Budget of 50ms with delays 10ms/20ms/40ms: the loop terminates once the
    // next wait would overshoot, allowing at most one attempt already in flight.
    let executor = build_executor(ExecutorConfig {
        retry: RetryPolicy {
            initial_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(100),
            max_elapsed_time: Duration::from_millis(50),
            multiplier: 2.0,
            randomization_factor: 0.0,
        },
        ..Default::default()
    });

    let start = Instant::now();
    let err = executor
        .process_with_retry(
            vec![1u32],
            |_| async { Err(TaskError::transient("item", "always failing")) },
            RunContext::default(),
        )
        .await
        .expect_err("a persistently failing operation must exhaust the budget");

    assert_eq!(err.code, code::RETRIES_EXHAUSTED);
    assert!(err.message.contains("always failing"));
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(25),
        "at least two backoff waits expected before exhaustion, took {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(700),
        "a 50ms budget must terminate well under a second, took {elapsed:?}"
    );
}

#[tokio::test]
async fn every_item_is_observed_exactly_once_across_workers() {
    let executor = build_executor(ExecutorConfig {
        workers: 4,
        retry: fast_retry(),
        ..Default::default()
    });

    let observed: Arc<tokio::sync::Mutex<Vec<u32>>> = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let observed_clone = Arc::clone(&observed);

    executor
        .process_concurrently(
            (0..100u32).collect(),
            move |n| {
                let observed = Arc::clone(&observed_clone);
                async move {
                    observed.lock().await.push(n);
                    Ok(())
                }
            },
            RunContext::default(),
        )
        .await
        .expect("all items succeed");

    let mut seen = observed.lock().await.clone();
    seen.sort_unstable();
    assert_eq!(
        seen,
        (0..100).collect::<Vec<u32>>(),
        "no item may be duplicated or dropped"
    );
}

#[tokio::test]
async fn batches_are_strictly_ordered_across_the_facade() {
    let executor = build_executor(ExecutorConfig {
        chunk_size: 3,
        retry: fast_retry(),
        ..Default::default()
    });

    let order: Arc<tokio::sync::Mutex<Vec<u32>>> = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let order_clone = Arc::clone(&order);

    assert_ok!(
        executor
            .process_in_batches(
                (0..10u32).collect(),
                move |n| {
                    let order = Arc::clone(&order_clone);
                    async move {
                        order.lock().await.push(n);
                        Ok(())
                    }
                },
                RunContext::default(),
            )
            .await
    );

    assert_eq!(
        *order.lock().await,
        (0..10).collect::<Vec<u32>>(),
        "batch mode processes items strictly in input order"
    );
}

#[tokio::test]
async fn overall_timeout_beats_a_slow_worker_pool() {
    let executor = build_executor(ExecutorConfig {
        workers: 2,
        retry: fast_retry(),
        overall_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    });

    let start = Instant::now();
    let err = executor
        .process_concurrently(
            (0..8u32).collect(),
            |_| async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            },
            RunContext::default(),
        )
        .await
        .expect_err("the overall timeout must fail the call");

    assert_eq!(err.code, code::DEADLINE_EXCEEDED);
    assert!(
        start.elapsed() < Duration::from_millis(500),
        "a 50ms overall timeout must not wait out 1s items, took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn first_item_error_aborts_concurrent_processing() {
    let executor = build_executor(ExecutorConfig {
        workers: 2,
        retry: fast_retry(),
        ..Default::default()
    });

    let processed = Arc::new(AtomicU32::new(0));
    let processed_clone = processed.clone();

    let err = executor
        .process_concurrently(
            (0..40u32).collect(),
            move |n| {
                let processed = processed_clone.clone();
                async move {
                    if n == 1 {
                        return Err(TaskError::permanent("item", "item 1 rejected"));
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    processed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            RunContext::default(),
        )
        .await
        .expect_err("the poisoned item must fail the call");

    assert_eq!(err.message, "item 1 rejected");
    assert!(!err.correlation_id.is_empty(), "facade attaches a correlation id");
    assert!(
        processed.load(Ordering::SeqCst) < 40,
        "remaining items must stop promptly after the first error"
    );
}
