//! Refresh coalescing: at most one in-flight refresh per cache store.
//!
//! The winner runs the refresh on a detached task so a cancelled trigger
//! still benefits later callers; followers wait on a shared watch channel.
//! A cooldown keeps a burst of cache misses from hammering the API after a
//! refresh just completed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

/// Result of a coalesced refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cache was replaced with fresh data.
    Refreshed,
    /// Slack rate-limited the refresh; the cache was left untouched.
    RateLimited,
    /// The refresh failed for another reason; the cache was left untouched.
    Failed(String),
}

#[derive(Debug, Default)]
struct FlightState {
    inflight: Option<watch::Receiver<Option<RefreshOutcome>>>,
    last: Option<(Instant, RefreshOutcome)>,
}

/// Single-flight coordinator with completion sharing and a cooldown.
#[derive(Debug)]
pub struct SingleFlight {
    state: Mutex<FlightState>,
    cooldown: Duration,
}

impl SingleFlight {
    /// Coordinator whose results are reused for `cooldown` after completion.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(FlightState::default()),
            cooldown,
        }
    }

    /// Run `refresh` unless one is already in flight (join it) or one
    /// completed within the cooldown window (reuse its outcome).
    ///
    /// The refresh future runs on a detached task: dropping this call's
    /// future leaves the refresh running to completion.
    pub async fn run<F, Fut>(self: &Arc<Self>, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = RefreshOutcome> + Send + 'static,
    {
        let receiver = {
            let mut state = self.state.lock().await;

            if let Some(rx) = &state.inflight {
                rx.clone()
            } else {
                if let Some((at, outcome)) = &state.last {
                    if at.elapsed() < self.cooldown {
                        return outcome.clone();
                    }
                }

                let (tx, rx) = watch::channel(None);
                state.inflight = Some(rx.clone());

                let this = Arc::clone(self);
                let future = refresh();
                tokio::spawn(async move {
                    let outcome = future.await;
                    this.settle(outcome.clone()).await;
                    let _ = tx.send(Some(outcome));
                });
                rx
            }
        };

        wait_for_outcome(receiver).await
    }

    async fn settle(&self, outcome: RefreshOutcome) {
        let mut state = self.state.lock().await;
        state.inflight = None;
        state.last = Some((Instant::now(), outcome));
    }
}

async fn wait_for_outcome(mut rx: watch::Receiver<Option<RefreshOutcome>>) -> RefreshOutcome {
    loop {
        {
            let value = rx.borrow();
            if let Some(outcome) = value.as_ref() {
                return outcome.clone();
            }
        }
        if rx.changed().await.is_err() {
            return RefreshOutcome::Failed("refresh task dropped".into());
        }
    }
}
