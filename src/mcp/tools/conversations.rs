//! `conversations_history` and `conversations_replies` tool handlers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use rmcp::model::{CallToolResult, Content};
use tokio_util::sync::CancellationToken;
use tracing::info_span;
use tracing::Instrument;

use super::util::{message_rows, parse_args, parse_limit, LimitSpec, MESSAGE_HEADER};
use crate::cache::resolver::resolve_channel;
use crate::limiter::{call_with_retry, slack_retry_delay};
use crate::mcp::handler::AppState;
use crate::models::message::{is_valid_ts, Message};
use crate::models::user::User;
use crate::output::csv;
use crate::slack::gateway::{HistoryParams, SlackGateway};
use crate::AppError;

#[derive(Debug, serde::Deserialize)]
struct HistoryInput {
    /// Channel ID, `#name`, or `@handle`.
    channel_id: String,
    /// Count or duration expression (`Nd`/`Nw`/`Nm`).
    #[serde(default)]
    limit: Option<String>,
    /// Opaque pagination cursor from a previous page.
    #[serde(default)]
    cursor: Option<String>,
    /// Include `channel_join`-style activity messages.
    #[serde(default)]
    include_activity_messages: bool,
}

#[derive(Debug, serde::Deserialize)]
struct RepliesInput {
    channel_id: String,
    /// Parent thread timestamp, `"<seconds>.<microseconds>"`.
    thread_ts: String,
    #[serde(default)]
    limit: Option<String>,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    include_activity_messages: bool,
}

/// Handle `conversations_history`.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on validation or Slack failures.
pub async fn history(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: HistoryInput = parse_args("conversations_history", args)?;
    let span = info_span!("conversations_history", channel = %input.channel_id);

    async move {
        let channel = resolve_channel(
            &state.cache,
            gateway,
            &state.limiters,
            ct,
            &input.channel_id,
        )
        .await?;

        let spec = resolve_limit(input.limit.as_deref(), input.cursor.as_deref(), "1d")?;
        let params = history_params(channel.clone(), None, input.cursor, &spec);

        let page = call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.conversations_history(&params)
        })
        .await?;

        let next_cursor = page.response_metadata.cursor().map(str::to_owned);
        let messages = collect_messages(&page.messages, &channel, input.include_activity_messages);

        Ok(render_messages(state, &messages, next_cursor.as_deref()).await)
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}

/// Handle `conversations_replies`.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on validation or Slack failures.
pub async fn replies(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: RepliesInput = parse_args("conversations_replies", args)?;
    let span = info_span!("conversations_replies", channel = %input.channel_id);

    async move {
        if !is_valid_ts(&input.thread_ts) {
            return Err(AppError::InvalidInput(format!(
                "thread_ts '{}' is not a slack timestamp (<seconds>.<microseconds>)",
                input.thread_ts
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

        let spec = resolve_limit(input.limit.as_deref(), input.cursor.as_deref(), "50")?;
        let params = history_params(
            channel.clone(),
            Some(input.thread_ts.clone()),
            input.cursor,
            &spec,
        );

        let page = call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.conversations_replies(&params)
        })
        .await?;

        let next_cursor = page.response_metadata.cursor().map(str::to_owned);
        let messages = collect_messages(&page.messages, &channel, input.include_activity_messages);

        Ok(render_messages(state, &messages, next_cursor.as_deref()).await)
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}

/// Apply the default and the cursor-exclusivity rule, then parse.
fn resolve_limit(
    limit: Option<&str>,
    cursor: Option<&str>,
    default: &str,
) -> Result<LimitSpec, AppError> {
    let now = Local::now();
    match (limit, cursor) {
        (Some(raw), Some(_)) => {
            let spec = parse_limit(raw, &now)?;
            if matches!(spec, LimitSpec::Window { .. }) {
                return Err(AppError::InvalidInput(
                    "a duration limit cannot be combined with a cursor".into(),
                ));
            }
            Ok(spec)
        }
        (Some(raw), None) => parse_limit(raw, &now),
        (None, Some(_)) => Ok(LimitSpec::Count(50)),
        (None, None) => parse_limit(default, &now),
    }
}

fn history_params(
    channel: String,
    thread_ts: Option<String>,
    cursor: Option<String>,
    spec: &LimitSpec,
) -> HistoryParams {
    let mut params = HistoryParams {
        channel,
        thread_ts,
        cursor,
        ..HistoryParams::default()
    };
    match spec {
        LimitSpec::Count(count) => params.limit = Some(*count),
        LimitSpec::Window { oldest, latest } => {
            params.oldest = Some(oldest.clone());
            params.latest = Some(latest.clone());
            params.limit = Some(999);
        }
    }
    params
}

fn collect_messages(
    wire: &[crate::slack::api::WireMessage],
    channel: &str,
    include_activity: bool,
) -> Vec<Message> {
    wire.iter()
        .cloned()
        .map(|m| m.into_message(channel))
        .filter(|m| include_activity || !m.is_activity())
        .collect()
}

/// Render a message table, enriching author names from the users cache.
pub(crate) async fn render_messages(
    state: &Arc<AppState>,
    messages: &[Message],
    next_cursor: Option<&str>,
) -> CallToolResult {
    let mut users: HashMap<String, User> = HashMap::new();
    for message in messages {
        if !message.user.is_empty() && !users.contains_key(&message.user) {
            if let Some(user) = state.cache.users.get(&message.user).await {
                users.insert(message.user.clone(), user);
            }
        }
    }

    let rows = message_rows(messages, |id| users.get(id).cloned(), next_cursor);
    CallToolResult::success(vec![Content::text(csv::render(&MESSAGE_HEADER, &rows))])
}
