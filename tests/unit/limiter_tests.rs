use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slack_conduit::limiter::{call_with_retry, slack_retry_delay, RateLimiter};
use slack_conduit::AppError;
use tokio_util::sync::CancellationToken;

fn unlimited() -> RateLimiter {
    RateLimiter::unlimited()
}

#[tokio::test]
async fn non_retryable_error_calls_operation_exactly_once() {
    let limiter = unlimited();
    let ct = CancellationToken::new();
    let calls = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&calls);
    let result: Result<(), _> = call_with_retry(
        &limiter,
        &ct,
        5,
        |_err| None,
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::InvalidInput("nope".into()))
            }
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retryable_for_k_errors_calls_k_plus_one_times() {
    let limiter = unlimited();
    let ct = CancellationToken::new();
    let calls = Arc::new(AtomicU32::new(0));

    // classify: retry the first two errors, then give up.
    let seen = Arc::new(AtomicU32::new(0));
    let classify_seen = Arc::clone(&seen);
    let counter = Arc::clone(&calls);

    let result: Result<(), _> = call_with_retry(
        &limiter,
        &ct,
        5,
        move |_err| {
            let n = classify_seen.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Some(Duration::from_millis(1))
            } else {
                None
            }
        },
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::RateLimited { retry_after: None })
            }
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retries_are_bounded_by_max_retries() {
    let limiter = unlimited();
    let ct = CancellationToken::new();
    let calls = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&calls);
    let result: Result<(), _> = call_with_retry(
        &limiter,
        &ct,
        2,
        |_err| Some(Duration::from_millis(1)),
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::RateLimited { retry_after: None })
            }
        },
    )
    .await;

    assert!(result.is_err());
    // Initial call plus two retries.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn success_passes_through() {
    let limiter = unlimited();
    let ct = CancellationToken::new();

    let result = call_with_retry(&limiter, &ct, 2, |_err| None, || async { Ok(7u32) }).await;
    assert_eq!(result.unwrap(), 7);
}

#[tokio::test]
async fn cancellation_aborts_the_backoff_sleep() {
    let limiter = unlimited();
    let ct = CancellationToken::new();
    ct.cancel();

    let result: Result<(), _> = call_with_retry(
        &limiter,
        &ct,
        2,
        |_err| Some(Duration::from_secs(60)),
        || async { Err(AppError::RateLimited { retry_after: None }) },
    )
    .await;

    assert!(matches!(result.unwrap_err(), AppError::Cancelled));
}

#[tokio::test]
async fn token_bucket_delays_the_second_acquire() {
    let limiter = RateLimiter::new(600, 1); // 100ms interval
    let ct = CancellationToken::new();

    let started = tokio::time::Instant::now();
    limiter.acquire(&ct).await.unwrap();
    limiter.acquire(&ct).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[test]
fn slack_classifier_only_retries_rate_limits() {
    assert_eq!(
        slack_retry_delay(&AppError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        }),
        Some(Duration::from_secs(7))
    );
    assert_eq!(
        slack_retry_delay(&AppError::RateLimited { retry_after: None }),
        Some(Duration::from_secs(1))
    );
    assert_eq!(slack_retry_delay(&AppError::NotFound("x".into())), None);
    assert_eq!(
        slack_retry_delay(&AppError::slack("conversations.history", "boom")),
        None
    );
}
