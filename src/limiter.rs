//! Slack-tier rate limiting and the bounded-retry call primitive.
//!
//! The limiter knows nothing about Slack. Callers supply a `classify`
//! callback that decides whether an error is retryable and how long to
//! wait, which is where Slack's `Retry-After` handling plugs in.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{AppError, Result};

/// Token bucket with a fixed refill rate.
///
/// Buckets hold a single burst token by default; Tier-2-boost gets a small
/// burst allowance for search.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    burst: u32,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    refilled_at: Instant,
}

impl RateLimiter {
    /// Limiter allowing `per_minute` requests with the given burst size.
    #[must_use]
    pub fn new(per_minute: u32, burst: u32) -> Self {
        let per_minute = per_minute.max(1);
        let burst = burst.max(1);
        Self {
            interval: Some(Duration::from_secs_f64(60.0 / f64::from(per_minute))),
            burst,
            state: Mutex::new(BucketState {
                tokens: f64::from(burst),
                refilled_at: Instant::now(),
            }),
        }
    }

    /// No-op limiter for internal non-API calls.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            interval: None,
            burst: 1,
            state: Mutex::new(BucketState {
                tokens: 1.0,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Wait until a token is available, or until `ct` fires.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cancelled` if the token fires first.
    pub async fn acquire(&self, ct: &CancellationToken) -> Result<()> {
        let Some(interval) = self.interval else {
            return Ok(());
        };

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let refill = now.duration_since(state.refilled_at).as_secs_f64()
                    / interval.as_secs_f64();
                state.tokens = (state.tokens + refill).min(f64::from(self.burst));
                state.refilled_at = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    None
                } else {
                    Some(interval.mul_f64(1.0 - state.tokens))
                }
            };

            match wait {
                None => return Ok(()),
                Some(delay) => {
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = ct.cancelled() => return Err(AppError::Cancelled),
                    }
                }
            }
        }
    }
}

/// Process-wide limiter singletons, one per Slack rate-limit tier.
#[derive(Debug, Clone)]
pub struct Limiters {
    /// Tier 2 (~20 req/min).
    pub tier2: Arc<RateLimiter>,
    /// Tier 2 with a burst allowance, used for search.
    pub tier2_boost: Arc<RateLimiter>,
    /// Tier 3 (~50 req/min), used for generic reads and the unread scan.
    pub tier3: Arc<RateLimiter>,
    /// No-op limiter for internal calls.
    pub none: Arc<RateLimiter>,
}

impl Default for Limiters {
    fn default() -> Self {
        Self {
            tier2: Arc::new(RateLimiter::new(20, 1)),
            tier2_boost: Arc::new(RateLimiter::new(20, 3)),
            tier3: Arc::new(RateLimiter::new(50, 1)),
            none: Arc::new(RateLimiter::unlimited()),
        }
    }
}

/// Run `operation` behind the limiter with bounded retries.
///
/// `classify` maps an error to an optional backoff: `None` means the error
/// is not retryable and is returned as-is; `Some(delay)` sleeps and retries,
/// up to `max_retries` attempts after the initial call. Both the limiter
/// wait and the backoff sleep abort when `ct` fires.
///
/// # Errors
///
/// Returns the last operation error, or `AppError::Cancelled`.
pub async fn call_with_retry<T, F, Fut, C>(
    limiter: &RateLimiter,
    ct: &CancellationToken,
    max_retries: u32,
    classify: C,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    C: Fn(&AppError) -> Option<Duration>,
{
    let mut retries = 0u32;

    loop {
        limiter.acquire(ct).await?;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(delay) = classify(&err) else {
                    return Err(err);
                };
                if retries >= max_retries {
                    return Err(err);
                }
                retries += 1;
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = ct.cancelled() => return Err(AppError::Cancelled),
                }
            }
        }
    }
}

/// Retry policy for Slack API errors: retry only rate-limit responses,
/// waiting out the advertised `Retry-After` (default one second).
#[must_use]
pub fn slack_retry_delay(err: &AppError) -> Option<Duration> {
    match err {
        AppError::RateLimited { retry_after } => {
            Some(retry_after.unwrap_or(Duration::from_secs(1)))
        }
        _ => None,
    }
}
