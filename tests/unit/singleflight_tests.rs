use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slack_conduit::cache::singleflight::{RefreshOutcome, SingleFlight};

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let flight = Arc::new(SingleFlight::new(Duration::from_secs(60)));
    let calls = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let flight = Arc::clone(&flight);
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            flight
                .run(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    RefreshOutcome::Refreshed
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.expect("join"), RefreshOutcome::Refreshed);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cooldown_reuses_the_last_outcome() {
    let flight = Arc::new(SingleFlight::new(Duration::from_secs(60)));
    let calls = Arc::new(AtomicU32::new(0));

    let first_calls = Arc::clone(&calls);
    let outcome = flight
        .run(move || async move {
            first_calls.fetch_add(1, Ordering::SeqCst);
            RefreshOutcome::RateLimited
        })
        .await;
    assert_eq!(outcome, RefreshOutcome::RateLimited);

    // Inside the cooldown the previous outcome is returned without a call.
    let second_calls = Arc::clone(&calls);
    let outcome = flight
        .run(move || async move {
            second_calls.fetch_add(1, Ordering::SeqCst);
            RefreshOutcome::Refreshed
        })
        .await;
    assert_eq!(outcome, RefreshOutcome::RateLimited);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_cooldown_runs_again() {
    let flight = Arc::new(SingleFlight::new(Duration::ZERO));
    let calls = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        let outcome = flight
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                RefreshOutcome::Refreshed
            })
            .await;
        assert_eq!(outcome, RefreshOutcome::Refreshed);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_outcomes_propagate_to_followers() {
    let flight = Arc::new(SingleFlight::new(Duration::ZERO));

    let outcome = flight
        .run(|| async { RefreshOutcome::Failed("boom".into()) })
        .await;
    assert_eq!(outcome, RefreshOutcome::Failed("boom".into()));
}
