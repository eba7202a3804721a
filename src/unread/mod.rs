//! Unread-conversation discovery.
//!
//! Two strategies gated on token kind: browser-session tokens get the
//! whole workspace from a single edge `client.counts` call; user OAuth
//! tokens fall back to a bounded, priority-budgeted fan-out over
//! `users.conversations` + `conversations.info` + `conversations.history`.
//! Bot tokens are rejected outright.

pub mod edge;
pub mod fallback;
pub mod filter;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::WorkspaceCache;
use crate::limiter::Limiters;
use crate::models::message::Message;
use crate::models::unread::{ChannelType, UnreadChannel};
use crate::slack::gateway::SlackGateway;
use crate::{AppError, Result};

/// Parameters of one unread-discovery run.
#[derive(Debug, Clone)]
pub struct UnreadParams {
    /// Cap on surfaced channels (per type group in the OAuth fallback).
    pub max_channels: usize,
    /// Cap on messages fetched per channel.
    pub max_messages_per_channel: usize,
    /// Include muted channels instead of filtering them out.
    pub include_muted: bool,
    /// Only channels where the viewer is mentioned.
    pub mentions_only: bool,
    /// Emit the unread messages themselves instead of a channel summary.
    pub include_messages: bool,
    /// Restrict to one routing class; `None` means all.
    pub channel_types: Option<ChannelType>,
}

impl Default for UnreadParams {
    fn default() -> Self {
        Self {
            max_channels: 20,
            max_messages_per_channel: 10,
            include_muted: false,
            mentions_only: false,
            include_messages: false,
            channel_types: None,
        }
    }
}

/// Result of an unread-discovery run.
#[derive(Debug, Clone, Default)]
pub struct UnreadReport {
    /// Leading comment lines explaining partial results, when applicable.
    pub notes: Vec<String>,
    /// Surviving channels, priority-sorted.
    pub channels: Vec<UnreadChannel>,
    /// Unread messages, populated when `include_messages` was set.
    pub messages: Vec<Message>,
}

/// Run the strategy appropriate for the gateway's token kind.
///
/// # Errors
///
/// Returns `AppError::Unsupported` for bot tokens, `AppError::Cancelled`
/// when the scan is aborted, and Slack errors that survive retries.
pub async fn discover(
    gateway: &Arc<SlackGateway>,
    cache: &WorkspaceCache,
    limiters: &Limiters,
    ct: &CancellationToken,
    params: &UnreadParams,
) -> Result<UnreadReport> {
    if gateway.is_bot_token() {
        return Err(AppError::Unsupported(
            "unread discovery is not available with a bot (xoxb) token; \
             use a user or browser-session token"
                .into(),
        ));
    }

    if gateway.is_oauth() {
        fallback::discover(gateway, cache, limiters, ct, params).await
    } else {
        edge::discover(gateway, cache, limiters, ct, params).await
    }
}
