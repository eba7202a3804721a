//! OAuth unread fallback: bounded fan-out when `client.counts` is out of
//! reach.
//!
//! Enumerates only conversations the user is in (`users.conversations`),
//! probes each for unread state, and stops when the per-type quota or the
//! scan cap is hit. Every call goes through the Tier-3 limiter with two
//! retries; rate-limit errors that survive retries skip the channel and
//! are counted into the header note so the client knows results may be
//! partial.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::filter::{fallback_budgets, fallback_note, never_visited, sort_by_priority};
use super::{UnreadParams, UnreadReport};
use crate::cache::WorkspaceCache;
use crate::limiter::{call_with_retry, slack_retry_delay, Limiters};
use crate::models::unread::{ChannelType, UnreadChannel};
use crate::slack::gateway::{HistoryParams, SlackGateway};
use crate::{AppError, Result};

/// Page size for `users.conversations`.
const SCAN_PAGE_SIZE: u16 = 100;

#[derive(Debug, Default)]
struct ScanStats {
    scanned: usize,
    api_calls: usize,
    rate_limit_skips: usize,
}

/// Discover unreads by scanning the user's conversations.
///
/// # Errors
///
/// Returns `AppError::Cancelled` when aborted and Slack errors that make
/// the scan impossible (enumeration failures).
pub async fn discover(
    gateway: &Arc<SlackGateway>,
    cache: &WorkspaceCache,
    limiters: &Limiters,
    ct: &CancellationToken,
    params: &UnreadParams,
) -> Result<UnreadReport> {
    let mut stats = ScanStats::default();
    let mut found: Vec<UnreadChannel> = Vec::new();
    let mut messages = Vec::new();

    // Mute prefs ride on the edge API; with OAuth they are simply absent.
    let muted = if params.include_muted {
        None
    } else {
        match gateway.muted_channels().await {
            Ok(set) => Some(set),
            Err(_) => None,
        }
    };
    let mute_note = !params.include_muted && muted.is_none();

    for group in fallback_budgets(params.max_channels) {
        if let Some(wanted) = params.channel_types {
            if !group_matches(group.types, wanted) {
                continue;
            }
        }

        let mut group_found = 0usize;
        let mut group_scanned = 0usize;
        let mut cursor: Option<String> = None;

        'pages: loop {
            if ct.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            stats.api_calls += 1;
            let page = call_with_retry(&limiters.tier3, ct, 2, slack_retry_delay, || {
                gateway.users_conversations(group.types, SCAN_PAGE_SIZE, cursor.as_deref())
            })
            .await?;

            for wire in page.channels {
                if ct.is_cancelled() {
                    return Err(AppError::Cancelled);
                }
                if group_found >= group.quota || group_scanned >= group.scan_cap {
                    break 'pages;
                }
                group_scanned += 1;
                stats.scanned += 1;

                let channel = wire.into_channel();
                if let Some(muted) = &muted {
                    if muted.get(&channel.id).copied().unwrap_or(false) {
                        continue;
                    }
                }

                stats.api_calls += 1;
                match probe_channel(gateway, cache, limiters, ct, params, &channel, &mut stats)
                    .await
                {
                    Ok(Some(unread)) => {
                        if let Some(wanted) = params.channel_types {
                            if unread.channel_type != wanted {
                                continue;
                            }
                        }
                        if params.include_messages {
                            stats.api_calls += 1;
                            collect_messages(
                                gateway, limiters, ct, params, &unread, &mut messages,
                            )
                            .await;
                        }
                        found.push(unread);
                        group_found += 1;
                    }
                    Ok(None) => {}
                    Err(err) if err.is_rate_limited() => {
                        stats.rate_limit_skips += 1;
                        warn!(channel = %channel.id, "unread probe rate-limited; skipping");
                    }
                    Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                    Err(err) => {
                        debug!(channel = %channel.id, %err, "unread probe failed; skipping");
                    }
                }
            }

            match page.response_metadata.cursor() {
                Some(next)
                    if group_found < group.quota && group_scanned < group.scan_cap =>
                {
                    cursor = Some(next.to_owned());
                }
                _ => break,
            }
        }
    }

    sort_by_priority(&mut found);

    let mut notes = vec![fallback_note(
        stats.scanned,
        stats.api_calls,
        stats.rate_limit_skips,
    )];
    if mute_note {
        notes.push("Muted channel filtering is unavailable.".to_owned());
    }

    Ok(UnreadReport {
        notes,
        channels: found,
        messages,
    })
}

/// Probe one conversation for unread state.
async fn probe_channel(
    gateway: &Arc<SlackGateway>,
    cache: &WorkspaceCache,
    limiters: &Limiters,
    ct: &CancellationToken,
    params: &UnreadParams,
    channel: &crate::models::channel::Channel,
    stats: &mut ScanStats,
) -> Result<Option<UnreadChannel>> {
    let info = call_with_retry(&limiters.tier3, ct, 2, slack_retry_delay, || {
        gateway.conversation_info(&channel.id)
    })
    .await?;

    let display_name = cache
        .channels
        .display_name(&channel.id, &cache.users)
        .await
        .unwrap_or_else(|| fallback_label(channel));

    if channel.is_im {
        // DMs report an unread_count directly.
        let unread_count = info.unread_count.unwrap_or(0);
        if unread_count == 0 {
            return Ok(None);
        }
        return Ok(Some(UnreadChannel {
            channel_id: channel.id.clone(),
            channel_name: display_name,
            channel_type: ChannelType::Dm,
            unread_count,
            last_read: info.last_read.clone().unwrap_or_default(),
            latest: String::new(),
        }));
    }

    // Non-DMs report last_read but no count. Dormant auto-joined channels
    // were never visited and would flood the results; group DMs are
    // intentional, so they are always probed.
    let last_read = info.last_read.clone();
    if never_visited(last_read.as_deref()) && !channel.is_mpim {
        return Ok(None);
    }

    stats.api_calls += 1;
    let history = call_with_retry(&limiters.tier3, ct, 2, slack_retry_delay, || {
        gateway.conversations_history(&HistoryParams {
            channel: channel.id.clone(),
            oldest: last_read.clone().filter(|lr| !never_visited(Some(lr.as_str()))),
            limit: Some(u16::try_from(params.max_messages_per_channel).unwrap_or(u16::MAX).max(1)),
            ..HistoryParams::default()
        })
    })
    .await?;

    if history.messages.is_empty() {
        return Ok(None);
    }

    let channel_type = if channel.is_mpim {
        ChannelType::GroupDm
    } else if channel.is_ext_shared {
        ChannelType::Partner
    } else {
        ChannelType::Internal
    };

    Ok(Some(UnreadChannel {
        channel_id: channel.id.clone(),
        channel_name: display_name,
        channel_type,
        unread_count: u32::try_from(history.messages.len()).unwrap_or(u32::MAX),
        last_read: last_read.unwrap_or_default(),
        latest: history
            .messages
            .first()
            .map(|m| m.ts.clone())
            .unwrap_or_default(),
    }))
}

async fn collect_messages(
    gateway: &Arc<SlackGateway>,
    limiters: &Limiters,
    ct: &CancellationToken,
    params: &UnreadParams,
    unread: &UnreadChannel,
    sink: &mut Vec<crate::models::message::Message>,
) {
    let history = call_with_retry(&limiters.tier3, ct, 2, slack_retry_delay, || {
        gateway.conversations_history(&HistoryParams {
            channel: unread.channel_id.clone(),
            oldest: if unread.last_read.is_empty() {
                None
            } else {
                Some(unread.last_read.clone())
            },
            limit: Some(u16::try_from(params.max_messages_per_channel).unwrap_or(u16::MAX).max(1)),
            ..HistoryParams::default()
        })
    })
    .await;

    match history {
        Ok(page) => sink.extend(
            page.messages
                .into_iter()
                .map(|m| m.into_message(&unread.channel_name)),
        ),
        Err(err) => warn!(channel = %unread.channel_id, %err, "unread message fetch failed"),
    }
}

fn fallback_label(channel: &crate::models::channel::Channel) -> String {
    if channel.name.is_empty() {
        channel.id.clone()
    } else if channel.is_im || channel.is_mpim {
        channel.name.clone()
    } else {
        format!("#{}", channel.name)
    }
}

fn group_matches(types: &str, wanted: ChannelType) -> bool {
    match wanted {
        ChannelType::Dm => types == "im",
        ChannelType::GroupDm => types == "mpim",
        ChannelType::Partner | ChannelType::Internal => types.contains("channel"),
    }
}
