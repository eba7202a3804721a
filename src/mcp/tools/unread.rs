//! `unread_conversations`: the unread-discovery engine as a tool.

use std::sync::Arc;

use rmcp::model::{CallToolResult, Content};
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

use super::util::{message_rows, parse_args, MESSAGE_HEADER};
use crate::mcp::handler::AppState;
use crate::models::unread::ChannelType;
use crate::output::csv;
use crate::slack::gateway::SlackGateway;
use crate::unread::{discover, UnreadParams};
use crate::AppError;

const UNREAD_HEADER: [&str; 6] = [
    "channel_id",
    "channel_name",
    "channel_type",
    "unread_count",
    "last_read",
    "latest",
];

#[derive(Debug, serde::Deserialize)]
struct UnreadInput {
    #[serde(default)]
    max_channels: Option<usize>,
    #[serde(default)]
    max_messages_per_channel: Option<usize>,
    #[serde(default)]
    include_muted: bool,
    #[serde(default)]
    mentions_only: bool,
    #[serde(default)]
    include_messages: bool,
    /// `all` (default), `dm`, `group_dm`, `partner`, or `internal`.
    #[serde(default)]
    channel_types: Option<String>,
}

/// Handle `unread_conversations`.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on validation failures, unsupported token
/// kinds, or Slack failures that survive retries.
pub async fn unread(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: UnreadInput = parse_args("unread_conversations", args)?;
    let span = info_span!("unread_conversations", kind = %gateway.kind());

    async move {
        let defaults = UnreadParams::default();
        let channel_types = match input.channel_types.as_deref() {
            None | Some("all" | "") => None,
            Some(raw) => Some(ChannelType::parse(raw).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "unknown channel_types '{raw}' (all, dm, group_dm, partner, internal)"
                ))
            })?),
        };

        let params = UnreadParams {
            max_channels: input
                .max_channels
                .unwrap_or(defaults.max_channels)
                .clamp(1, 200),
            max_messages_per_channel: input
                .max_messages_per_channel
                .unwrap_or(defaults.max_messages_per_channel)
                .clamp(1, 100),
            include_muted: input.include_muted,
            mentions_only: input.mentions_only,
            include_messages: input.include_messages,
            channel_types,
        };

        let report = discover(gateway, &state.cache, &state.limiters, ct, &params).await?;

        let mut out = String::new();
        for note in &report.notes {
            out.push_str("# ");
            out.push_str(note);
            out.push('\n');
        }

        if params.include_messages {
            let rows = message_rows(&report.messages, |_| None, None);
            out.push_str(&csv::render(&MESSAGE_HEADER, &rows));
        } else {
            let rows: Vec<Vec<String>> = report
                .channels
                .iter()
                .map(|c| {
                    vec![
                        c.channel_id.clone(),
                        c.channel_name.clone(),
                        c.channel_type.to_string(),
                        c.unread_count.to_string(),
                        c.last_read.clone(),
                        c.latest.clone(),
                    ]
                })
                .collect();
            out.push_str(&csv::render(&UNREAD_HEADER, &rows));
        }

        Ok(CallToolResult::success(vec![Content::text(out)]))
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}
