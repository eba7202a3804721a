//! `attachment_get_data`: fetch a file's content, inline or base64.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rmcp::model::{CallToolResult, Content};
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

use super::util::parse_args;
use crate::limiter::{call_with_retry, slack_retry_delay};
use crate::mcp::handler::AppState;
use crate::mcp::registry::ensure_channel_allowed;
use crate::slack::gateway::SlackGateway;
use crate::AppError;

/// Hard cap on downloaded attachment size.
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, serde::Deserialize)]
struct AttachmentInput {
    file_id: String,
}

/// Handle `attachment_get_data`.
///
/// Text MIME types are returned inline; everything else is base64-encoded.
/// Files over 5 MiB are refused before the download starts.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on policy, size, or Slack failures.
pub async fn get_data(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: AttachmentInput = parse_args("attachment_get_data", args)?;
    let span = info_span!("attachment_get_data", file = %input.file_id);

    async move {
        if input.file_id.trim().is_empty() {
            return Err(AppError::InvalidInput("file_id must not be empty".into()));
        }
        // Attachment access is gated by its enable var; there is no channel
        // in play, so an empty channel goes through the generic check.
        ensure_channel_allowed("attachment_get_data", "", &state.config.enabled_tools)?;

        let file = call_with_retry(&state.limiters.tier3, ct, 2, slack_retry_delay, || {
            gateway.file_info(&input.file_id)
        })
        .await?;

        if usize::try_from(file.size).map_or(true, |size| size > MAX_ATTACHMENT_BYTES) {
            return Err(AppError::ResourceLimit(format!(
                "file {} is {} bytes; the cap is {MAX_ATTACHMENT_BYTES}",
                file.id, file.size
            )));
        }
        if file.url_private_download.is_empty() {
            return Err(AppError::NotFound(format!(
                "file {} has no downloadable content",
                file.id
            )));
        }

        let bytes = gateway
            .download_file(&file.url_private_download, MAX_ATTACHMENT_BYTES)
            .await?;

        let (encoding, data) = if is_text_mime(&file.mimetype) {
            match String::from_utf8(bytes.to_vec()) {
                Ok(text) => ("inline", text),
                Err(_) => ("base64", BASE64.encode(&bytes)),
            }
        } else {
            ("base64", BASE64.encode(&bytes))
        };

        let body = serde_json::json!({
            "file_id": file.id,
            "name": file.name,
            "mimetype": file.mimetype,
            "size": file.size,
            "encoding": encoding,
            "data": data,
        });
        let content = Content::json(body).map_err(|err| {
            AppError::Io(format!("serialize attachment response: {err}"))
        })?;
        Ok(CallToolResult::success(vec![content]))
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}

fn is_text_mime(mimetype: &str) -> bool {
    mimetype.starts_with("text/")
        || matches!(
            mimetype,
            "application/json"
                | "application/xml"
                | "application/javascript"
                | "application/x-yaml"
                | "application/csv"
        )
}
