//! Reaction tools: `reactions_add`, `reactions_remove`, `reactions_get`.

use std::sync::Arc;

use rmcp::model::{CallToolResult, Content};
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

use super::util::parse_args;
use crate::cache::resolver::resolve_channel;
use crate::limiter::{call_with_retry, slack_retry_delay};
use crate::mcp::handler::AppState;
use crate::mcp::registry::ensure_channel_allowed;
use crate::models::message::is_valid_ts;
use crate::output::csv;
use crate::slack::gateway::SlackGateway;
use crate::AppError;

#[derive(Debug, serde::Deserialize)]
struct ReactionInput {
    channel_id: String,
    timestamp: String,
    /// Emoji name; surrounding colons are tolerated and stripped.
    emoji: String,
}

#[derive(Debug, serde::Deserialize)]
struct GetReactionsInput {
    channel_id: String,
    timestamp: String,
}

/// Handle `reactions_add` / `reactions_remove`; `add` selects direction.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on policy, validation, or Slack failures.
pub async fn toggle(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
    add: bool,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let tool = if add { "reactions_add" } else { "reactions_remove" };
    let input: ReactionInput = parse_args(tool, args)?;
    let span = info_span!("reaction_toggle", tool, channel = %input.channel_id);

    async move {
        if !is_valid_ts(&input.timestamp) {
            return Err(AppError::InvalidInput(format!(
                "timestamp '{}' is not a slack timestamp",
                input.timestamp
            )));
        }
        let emoji = input.emoji.trim().trim_matches(':').to_owned();
        if emoji.is_empty() {
            return Err(AppError::InvalidInput("emoji must not be empty".into()));
        }

        let channel = resolve_channel(
            &state.cache,
            gateway,
            &state.limiters,
            ct,
            &input.channel_id,
        )
        .await?;
        ensure_channel_allowed(tool, &channel, &state.config.enabled_tools)?;

        call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || async {
            if add {
                gateway.add_reaction(&channel, &input.timestamp, &emoji).await
            } else {
                gateway
                    .remove_reaction(&channel, &input.timestamp, &emoji)
                    .await
            }
        })
        .await?;

        let action = if add { "added" } else { "removed" };
        let rows = vec![vec![
            channel,
            input.timestamp.clone(),
            emoji,
            action.to_owned(),
        ]];
        Ok(CallToolResult::success(vec![Content::text(csv::render(
            &["channel", "ts", "emoji", "status"],
            &rows,
        ))]))
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}

/// Handle `reactions_get`: the reaction tallies on one message.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on validation or Slack failures.
pub async fn get(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: GetReactionsInput = parse_args("reactions_get", args)?;
    let span = info_span!("reactions_get", channel = %input.channel_id);

    async move {
        if !is_valid_ts(&input.timestamp) {
            return Err(AppError::InvalidInput(format!(
                "timestamp '{}' is not a slack timestamp",
                input.timestamp
            )));
        }

        let channel = resolve_channel(
            &state.cache,
            gateway,
            &state.limiters,
            ct,
            &input.channel_id,
        )
        .await?;

        let message = call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.get_reactions(&channel, &input.timestamp)
        })
        .await?;

        let rows: Vec<Vec<String>> = message
            .reactions
            .iter()
            .map(|r| {
                vec![
                    channel.clone(),
                    input.timestamp.clone(),
                    r.name.clone(),
                    r.count.to_string(),
                ]
            })
            .collect();
        Ok(CallToolResult::success(vec![Content::text(csv::render(
            &["channel", "ts", "emoji", "count"],
            &rows,
        ))]))
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}
