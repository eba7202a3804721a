//! Write-side message tools: `conversations_add_message`,
//! `conversations_edit_message`, `conversations_delete_message`, and
//! `conversations_mark_read`.

use std::sync::Arc;

use regex::Regex;
use rmcp::model::{CallToolResult, Content};
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, warn, Instrument};

use super::conversations::render_messages;
use super::util::parse_args;
use crate::cache::resolver::resolve_channel;
use crate::config::{env_var, is_truthy};
use crate::limiter::{call_with_retry, slack_retry_delay};
use crate::mcp::handler::AppState;
use crate::mcp::registry::ensure_channel_allowed;
use crate::models::message::is_valid_ts;
use crate::output::csv;
use crate::slack::gateway::{HistoryParams, PostOptions, SlackGateway};
use crate::AppError;

#[derive(Debug, serde::Deserialize)]
struct AddMessageInput {
    channel_id: String,
    /// Message body. `payload` is the legacy spelling.
    #[serde(alias = "payload")]
    text: String,
    /// `text/plain` or `text/markdown` (default).
    #[serde(default)]
    content_type: Option<String>,
    /// Reply into this thread.
    #[serde(default)]
    thread_ts: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct EditMessageInput {
    channel_id: String,
    timestamp: String,
    text: String,
}

#[derive(Debug, serde::Deserialize)]
struct DeleteMessageInput {
    channel_id: String,
    timestamp: String,
}

#[derive(Debug, serde::Deserialize)]
struct MarkInput {
    channel_id: String,
    /// Mark read up to this timestamp; defaults to the latest message.
    #[serde(default)]
    ts: Option<String>,
}

/// Handle `conversations_add_message`.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on policy, validation, or Slack failures.
pub async fn add_message(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: AddMessageInput = parse_args("conversations_add_message", args)?;
    let span = info_span!("conversations_add_message", channel = %input.channel_id);

    async move {
        let markdown = match input.content_type.as_deref() {
            None | Some("text/markdown") => true,
            Some("text/plain") => false,
            Some(other) => {
                return Err(AppError::InvalidInput(format!(
                    "content_type '{other}' is not supported (text/plain or text/markdown)"
                )));
            }
        };
        if input.text.trim().is_empty() {
            return Err(AppError::InvalidInput("text must not be empty".into()));
        }
        if let Some(ts) = &input.thread_ts {
            if !is_valid_ts(ts) {
                return Err(AppError::InvalidInput(format!(
                    "thread_ts '{ts}' is not a slack timestamp"
                )));
            }
        }

        let channel = resolve_channel(
            &state.cache,
            gateway,
            &state.limiters,
            ct,
            &input.channel_id,
        )
        .await?;
        ensure_channel_allowed("conversations_add_message", &channel, &state.config.enabled_tools)?;

        let options = PostOptions {
            thread_ts: input.thread_ts.clone(),
            markdown,
            unfurl: unfurling_allowed(&input.text),
        };

        let posted = call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.post_message(&channel, &input.text, &options)
        })
        .await?;

        // Optionally advance the read cursor to our own message.
        if env_var("ADD_MESSAGE_MARK").is_some_and(|v| is_truthy(&v)) {
            if let Err(err) = gateway.mark_conversation(&channel, &posted.ts).await {
                warn!(%err, "post-send mark failed");
            }
        }

        // Return the posted message as Slack recorded it.
        let page = call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.conversations_history(&HistoryParams {
                channel: channel.clone(),
                latest: Some(posted.ts.clone()),
                limit: Some(1),
                inclusive: true,
                ..HistoryParams::default()
            })
        })
        .await?;

        let messages: Vec<_> = page
            .messages
            .into_iter()
            .map(|m| m.into_message(&channel))
            .collect();
        Ok(render_messages(state, &messages, None).await)
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}

/// Handle `conversations_edit_message`.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on policy, validation, or Slack failures.
pub async fn edit_message(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: EditMessageInput = parse_args("conversations_edit_message", args)?;
    let span = info_span!("conversations_edit_message", channel = %input.channel_id);

    async move {
        if !is_valid_ts(&input.timestamp) {
            return Err(AppError::InvalidInput(format!(
                "timestamp '{}' is not a slack timestamp",
                input.timestamp
            )));
        }
        if input.text.trim().is_empty() {
            return Err(AppError::InvalidInput("text must not be empty".into()));
        }

        let channel = resolve_channel(
            &state.cache,
            gateway,
            &state.limiters,
            ct,
            &input.channel_id,
        )
        .await?;
        ensure_channel_allowed("conversations_edit_message", &channel, &state.config.enabled_tools)?;

        let edited = call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.update_message(&channel, &input.timestamp, &input.text)
        })
        .await?;

        let page = call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.conversations_history(&HistoryParams {
                channel: channel.clone(),
                latest: Some(edited.ts.clone()),
                limit: Some(1),
                inclusive: true,
                ..HistoryParams::default()
            })
        })
        .await?;

        let messages: Vec<_> = page
            .messages
            .into_iter()
            .map(|m| m.into_message(&channel))
            .collect();
        Ok(render_messages(state, &messages, None).await)
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}

/// Handle `conversations_delete_message`.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on policy, validation, or Slack failures.
pub async fn delete_message(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: DeleteMessageInput = parse_args("conversations_delete_message", args)?;
    let span = info_span!("conversations_delete_message", channel = %input.channel_id);

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
        ensure_channel_allowed("conversations_delete_message", &channel, &state.config.enabled_tools)?;

        call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.delete_message(&channel, &input.timestamp)
        })
        .await?;

        let rows = vec![vec![
            channel,
            input.timestamp.clone(),
            "deleted".to_owned(),
        ]];
        Ok(CallToolResult::success(vec![Content::text(csv::render(
            &["channel", "ts", "status"],
            &rows,
        ))]))
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}

/// Handle `conversations_mark_read`.
///
/// With no `ts`, the channel's latest message is fetched and marked.
/// Marking the same timestamp twice is a no-op on Slack's side.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on policy, validation, or Slack failures.
pub async fn mark_read(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: MarkInput = parse_args("conversations_mark_read", args)?;
    let span = info_span!("conversations_mark_read", channel = %input.channel_id);

    async move {
        let channel = resolve_channel(
            &state.cache,
            gateway,
            &state.limiters,
            ct,
            &input.channel_id,
        )
        .await?;
        ensure_channel_allowed("conversations_mark_read", &channel, &state.config.enabled_tools)?;

        let ts = match input.ts {
            Some(ts) => {
                if !is_valid_ts(&ts) {
                    return Err(AppError::InvalidInput(format!(
                        "ts '{ts}' is not a slack timestamp"
                    )));
                }
                ts
            }
            None => {
                let page =
                    call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
                        gateway.conversations_history(&HistoryParams {
                            channel: channel.clone(),
                            limit: Some(1),
                            ..HistoryParams::default()
                        })
                    })
                    .await?;
                page.messages
                    .first()
                    .map(|m| m.ts.clone())
                    .ok_or_else(|| {
                        AppError::NotFound(format!("no messages in channel {channel}"))
                    })?
            }
        };

        call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.mark_conversation(&channel, &ts)
        })
        .await?;

        let rows = vec![vec![channel, ts, "marked".to_owned()]];
        Ok(CallToolResult::success(vec![Content::text(csv::render(
            &["channel", "ts", "status"],
            &rows,
        ))]))
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}

fn url_host_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)] // Pattern is a literal; cannot fail.
        Regex::new(r"https?://([^/\s>|]+)").expect("valid regex literal")
    })
}

/// Decide whether a message may unfurl, from `SLACK_MCP_ADD_MESSAGE_UNFURLING`.
///
/// Unset means no unfurling. A truthy value unfurls everything. A comma
/// list of hosts unfurls only when every URL in the message points at a
/// listed host — one unknown host disables unfurling for the whole post.
#[must_use]
pub fn unfurling_allowed(text: &str) -> bool {
    let Some(policy) = env_var("ADD_MESSAGE_UNFURLING") else {
        return false;
    };
    if is_truthy(&policy) {
        return true;
    }

    let allowed: Vec<String> = policy
        .split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect();

    url_host_pattern().captures_iter(text).all(|caps| {
        let host = caps[1]
            .split(':')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        allowed.iter().any(|a| a == &host)
    })
}
