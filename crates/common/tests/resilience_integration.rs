//! Integration tests for resilience module
//!
//! Combines the admission gate with per-item retry the way the upload
//! pipeline does.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use panelpost_common::resilience::policies::PredicateRetry;
use panelpost_common::resilience::{AdmissionGate, RetryConfig, RetryExecutor};

/// Custom error type for testing
#[derive(Debug, Clone, PartialEq, Eq)]
struct TestError {
    status: u16,
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status {}", self.status)
    }
}

/// Validates bounded, retried work items.
///
/// # Test Steps
/// 1. Run 8 items through a gate of 3, each failing once with a 503
/// 2. Retry only 5xx errors
/// 3. Check all items complete, each made two calls, and the gate never
///    admitted more than three at once
#[tokio::test(start_paused = true)]
async fn test_gate_with_retry() {
    let gate = AdmissionGate::new(3).unwrap();
    let executor = Arc::new(RetryExecutor::new(
        RetryConfig::default(),
        PredicateRetry::new(|e: &TestError| e.status >= 500),
    ));
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicU32::new(0));

    let items = (0..8).map(|item| {
        let gate = gate.clone();
        let executor = Arc::clone(&executor);
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        let calls = Arc::clone(&calls);
        async move {
            gate.run(async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                let attempts = Arc::new(AtomicU32::new(0));
                let result = executor
                    .execute(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let attempts = Arc::clone(&attempts);
                        async move {
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                                Err(TestError { status: 503 })
                            } else {
                                Ok(item)
                            }
                        }
                    })
                    .await;
                active.fetch_sub(1, Ordering::SeqCst);
                result
            })
            .await
            .unwrap()
        }
    });

    let results = try_join_all(items).await.unwrap();
    assert_eq!(results, (0..8).collect::<Vec<_>>());
    assert_eq!(calls.load(Ordering::SeqCst), 16);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(gate.available(), 3);
}

/// Validates that terminal errors bypass retry.
///
/// # Test Steps
/// 1. Fail with a 400
/// 2. Check only one call was made and the error is returned as-is
#[tokio::test]
async fn test_terminal_error_not_retried() {
    let executor =
        RetryExecutor::new(RetryConfig::default(), PredicateRetry::new(|e: &TestError| e.status >= 500));
    let calls = AtomicU32::new(0);
    let result: Result<(), TestError> = executor
        .execute(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError { status: 400 }) }
        })
        .await;

    assert_eq!(result, Err(TestError { status: 400 }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
