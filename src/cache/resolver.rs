//! Channel-reference resolution: `#name` / `@handle` / group-DM label → ID.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::singleflight::RefreshOutcome;
use super::WorkspaceCache;
use crate::limiter::Limiters;
use crate::models::channel::Channel;
use crate::slack::gateway::SlackGateway;
use crate::{AppError, Result};

/// Resolve a channel reference to its ID.
///
/// IDs pass through untouched. References are looked up in the channels
/// index; a miss triggers a single-flight refresh and one retry. A refresh
/// that was itself rate-limited is reported distinctly from an ordinary
/// miss so callers can tell the user to retry rather than fix the name.
///
/// # Errors
///
/// - `AppError::NotFound` — the reference does not resolve.
/// - `AppError::RefreshRateLimited` — unresolved, and the refresh that
///   might have resolved it was rate-limited.
/// - `AppError::Slack` — the refresh failed outright.
pub async fn resolve_channel(
    cache: &WorkspaceCache,
    gateway: &Arc<SlackGateway>,
    limiters: &Limiters,
    ct: &CancellationToken,
    reference: &str,
) -> Result<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(AppError::InvalidInput("channel_id must not be empty".into()));
    }

    if Channel::looks_like_id(reference) {
        return Ok(reference.to_owned());
    }

    if let Some(id) = cache.channels.resolve_ref(reference).await {
        return Ok(id);
    }

    debug!(reference, "channel reference missed cache; refreshing");
    let outcome = cache
        .force_refresh_channels(Arc::clone(gateway), limiters, ct.clone())
        .await;

    match outcome {
        RefreshOutcome::Refreshed => {}
        RefreshOutcome::RateLimited => {
            return Err(AppError::RefreshRateLimited(format!(
                "channel '{reference}'"
            )));
        }
        RefreshOutcome::Failed(message) => {
            return Err(AppError::slack("conversations.list", message));
        }
    }

    cache
        .channels
        .resolve_ref(reference)
        .await
        .ok_or_else(|| AppError::NotFound(format!("channel '{reference}'")))
}
