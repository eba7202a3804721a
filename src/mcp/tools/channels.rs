//! `channels_list`: the cached channel directory as CSV.

use std::sync::Arc;

use rmcp::model::{CallToolResult, Content};
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

use super::util::{decode_key_cursor, encode_key_cursor, parse_args};
use crate::cache::singleflight::RefreshOutcome;
use crate::mcp::handler::AppState;
use crate::models::channel::Channel;
use crate::output::csv;
use crate::slack::gateway::SlackGateway;
use crate::AppError;

/// Default and maximum page sizes for the directory listing.
const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 999;

const CHANNELS_HEADER: [&str; 7] = [
    "id",
    "name",
    "topic",
    "purpose",
    "member_count",
    "type",
    "cursor",
];

#[derive(Debug, serde::Deserialize)]
struct ChannelsListInput {
    /// Comma list of `public_channel`, `private_channel`, `im`, `mpim`,
    /// or `all` (default).
    #[serde(default)]
    channel_types: Option<String>,
    /// `popularity` sorts by member count descending.
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    cursor: Option<String>,
}

/// Handle `channels_list`.
///
/// Serves from the channels cache; when the directory has not been
/// populated yet, a single-flight refresh is awaited first. The cursor is
/// an opaque base64 wrapper around the last-seen channel ID.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on validation or refresh failures.
pub async fn list(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: ChannelsListInput = parse_args("channels_list", args)?;
    let span = info_span!("channels_list");

    async move {
        let wanted = parse_types(input.channel_types.as_deref())?;
        let limit = input.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let after = match input.cursor.as_deref() {
            Some(cursor) => Some(decode_key_cursor(cursor)?),
            None => None,
        };

        if !state.cache.channels.is_ready() {
            match state
                .cache
                .force_refresh_channels(Arc::clone(gateway), &state.limiters, ct.clone())
                .await
            {
                RefreshOutcome::Refreshed => {}
                RefreshOutcome::RateLimited => {
                    return Err(AppError::RefreshRateLimited("channel directory".into()));
                }
                RefreshOutcome::Failed(message) => {
                    return Err(AppError::slack("conversations.list", message));
                }
            }
        }

        let mut channels: Vec<Channel> = state
            .cache
            .channels
            .all()
            .await
            .into_iter()
            .filter(|c| wanted.iter().any(|w| type_matches(c, w)))
            .collect();

        // ID order keeps cursors stable; popularity sorting re-sorts the
        // page window only after the cut.
        channels.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(after) = &after {
            channels.retain(|c| c.id.as_str() > after.as_str());
        }

        let has_more = channels.len() > limit;
        channels.truncate(limit);
        if input.sort.as_deref() == Some("popularity") {
            channels.sort_by(|a, b| b.member_count.cmp(&a.member_count));
        }

        let next_cursor = if has_more {
            // The cursor must reflect ID order, not display order.
            channels
                .iter()
                .map(|c| c.id.as_str())
                .max()
                .map(encode_key_cursor)
        } else {
            None
        };

        let total = channels.len();
        let rows: Vec<Vec<String>> = channels
            .iter()
            .enumerate()
            .map(|(idx, channel)| {
                let cursor_cell = match (&next_cursor, idx + 1 == total) {
                    (Some(cursor), true) => cursor.clone(),
                    _ => String::new(),
                };
                vec![
                    channel.id.clone(),
                    channel.name.clone(),
                    channel.topic.clone(),
                    channel.purpose.clone(),
                    channel.member_count.to_string(),
                    type_label(channel).to_owned(),
                    cursor_cell,
                ]
            })
            .collect();

        Ok(CallToolResult::success(vec![Content::text(csv::render(
            &CHANNELS_HEADER,
            &rows,
        ))]))
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}

fn parse_types(raw: Option<&str>) -> Result<Vec<String>, AppError> {
    const VALID: [&str; 4] = ["public_channel", "private_channel", "im", "mpim"];

    let raw = raw.unwrap_or("all").trim();
    if raw.is_empty() || raw == "all" {
        return Ok(VALID.iter().map(|t| (*t).to_owned()).collect());
    }

    let mut types = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if !VALID.contains(&token) {
            return Err(AppError::InvalidInput(format!(
                "unknown channel type '{token}' (public_channel, private_channel, im, mpim, all)"
            )));
        }
        types.push(token.to_owned());
    }
    Ok(types)
}

fn type_matches(channel: &Channel, wanted: &str) -> bool {
    match wanted {
        "im" => channel.is_im,
        "mpim" => channel.is_mpim,
        "private_channel" => channel.is_private && !channel.is_im && !channel.is_mpim,
        "public_channel" => !channel.is_private && !channel.is_im && !channel.is_mpim,
        _ => false,
    }
}

fn type_label(channel: &Channel) -> &'static str {
    if channel.is_im {
        "im"
    } else if channel.is_mpim {
        "mpim"
    } else if channel.is_private {
        "private_channel"
    } else {
        "public_channel"
    }
}
