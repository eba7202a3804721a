//! Edge unread strategy: one `client.counts` call covers the workspace.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::filter::{filter_candidates, sort_candidates, EdgeCandidate};
use super::{UnreadParams, UnreadReport};
use crate::cache::WorkspaceCache;
use crate::limiter::{call_with_retry, slack_retry_delay, Limiters};
use crate::models::unread::{ChannelType, UnreadChannel};
use crate::slack::edge::CountsEntry;
use crate::slack::gateway::{HistoryParams, SlackGateway};
use crate::{AppError, Result};

/// Cap on messages fetched when backfilling a real unread count.
const BACKFILL_LIMIT: u16 = 20;

/// Discover unreads through the edge `client.counts` endpoint.
///
/// # Errors
///
/// Returns `AppError::Cancelled` when aborted and Slack errors that
/// survive retries.
pub async fn discover(
    gateway: &Arc<SlackGateway>,
    cache: &WorkspaceCache,
    limiters: &Limiters,
    ct: &CancellationToken,
    params: &UnreadParams,
) -> Result<UnreadReport> {
    let mut notes = Vec::new();

    // ── Muted set (unless muted channels were asked for) ─
    let muted = if params.include_muted {
        None
    } else {
        match gateway.muted_channels().await {
            Ok(set) => Some(set),
            Err(err) => {
                warn!(%err, "muted prefs unavailable; skipping mute filter");
                notes.push("Muted channel filtering is unavailable.".to_owned());
                None
            }
        }
    };

    // ── One counts call for the whole workspace ──────────
    let counts = call_with_retry(&limiters.tier3, ct, 2, slack_retry_delay, || {
        gateway.client_counts()
    })
    .await?;

    let mut candidates: Vec<EdgeCandidate> = Vec::new();
    for entry in counts.ims {
        candidates.push(annotate(entry, ChannelType::Dm, cache).await);
    }
    for entry in counts.mpims {
        candidates.push(annotate(entry, ChannelType::GroupDm, cache).await);
    }
    for entry in counts.channels {
        let kind = match cache.channels.get(&entry.id).await {
            Some(channel) if channel.is_ext_shared => ChannelType::Partner,
            _ => ChannelType::Internal,
        };
        candidates.push(annotate(entry, kind, cache).await);
    }

    let mut survivors = filter_candidates(
        candidates,
        muted.as_ref(),
        params.mentions_only,
        params.channel_types,
    );
    sort_candidates(&mut survivors);
    survivors.truncate(params.max_channels);
    debug!(count = survivors.len(), "edge unread candidates after filters");

    // ── Backfill counts and collect messages ─────────────
    let mut report = UnreadReport {
        notes,
        ..UnreadReport::default()
    };

    for candidate in survivors {
        if ct.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let entry = &candidate.entry;
        let mut unread_count = entry.mention_count;

        if unread_count == 0 {
            // Unreads without mentions: count the actual messages since
            // last_read, assuming one when the channel was never read.
            if entry.last_read.is_empty() {
                unread_count = 1;
            } else {
                let history = call_with_retry(&limiters.tier3, ct, 2, slack_retry_delay, || {
                    gateway.conversations_history(&HistoryParams {
                        channel: entry.id.clone(),
                        oldest: Some(entry.last_read.clone()),
                        limit: Some(BACKFILL_LIMIT),
                        ..HistoryParams::default()
                    })
                })
                .await;
                match history {
                    Ok(page) => {
                        unread_count = u32::try_from(page.messages.len()).unwrap_or(u32::MAX);
                    }
                    Err(err) => {
                        warn!(channel = %entry.id, %err, "unread count backfill failed");
                        unread_count = 1;
                    }
                }
            }
        }

        if params.include_messages {
            let page = call_with_retry(&limiters.tier3, ct, 2, slack_retry_delay, || {
                gateway.conversations_history(&HistoryParams {
                    channel: entry.id.clone(),
                    oldest: some_when_read(&entry.last_read),
                    limit: Some(clamp_limit(params.max_messages_per_channel)),
                    ..HistoryParams::default()
                })
            })
            .await?;
            report.messages.extend(
                page.messages
                    .into_iter()
                    .map(|m| m.into_message(&candidate.display_name)),
            );
        }

        report.channels.push(UnreadChannel {
            channel_id: entry.id.clone(),
            channel_name: candidate.display_name.clone(),
            channel_type: candidate.channel_type,
            unread_count,
            last_read: entry.last_read.clone(),
            latest: entry.latest.clone(),
        });
    }

    Ok(report)
}

async fn annotate(entry: CountsEntry, kind: ChannelType, cache: &WorkspaceCache) -> EdgeCandidate {
    let display_name = cache
        .channels
        .display_name(&entry.id, &cache.users)
        .await
        .unwrap_or_else(|| entry.id.clone());
    EdgeCandidate {
        entry,
        channel_type: kind,
        display_name,
    }
}

fn some_when_read(last_read: &str) -> Option<String> {
    if last_read.is_empty() {
        None
    } else {
        Some(last_read.to_owned())
    }
}

fn clamp_limit(limit: usize) -> u16 {
    u16::try_from(limit).unwrap_or(u16::MAX).max(1)
}
