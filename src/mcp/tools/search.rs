//! `conversations_search_messages`: composed search with page cursors.

use std::sync::Arc;

use chrono::Local;
use rmcp::model::{CallToolResult, Content};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use super::util::{decode_page_cursor, encode_page_cursor, parse_args};
use crate::limiter::{call_with_retry, slack_retry_delay};
use crate::mcp::handler::AppState;
use crate::models::message::ts_to_rfc3339;
use crate::output::csv;
use crate::search::query::{build_query, SearchFilters};
use crate::slack::gateway::SlackGateway;
use crate::AppError;

/// Default and maximum page sizes for search.
const DEFAULT_COUNT: u16 = 20;
const MAX_COUNT: u16 = 100;

/// Column set for search result tables.
const SEARCH_HEADER: [&str; 8] = [
    "user_id",
    "user_name",
    "channel_id",
    "channel_name",
    "ts",
    "time",
    "text",
    "cursor",
];

#[derive(Debug, Default, serde::Deserialize)]
struct SearchInput {
    #[serde(default)]
    search_query: Option<String>,
    #[serde(default)]
    filter_in_channel: Option<String>,
    #[serde(default)]
    filter_in_im_or_mpim: Option<String>,
    #[serde(default)]
    filter_users_with: Option<String>,
    #[serde(default)]
    filter_users_from: Option<String>,
    #[serde(default)]
    filter_date_before: Option<String>,
    #[serde(default)]
    filter_date_after: Option<String>,
    #[serde(default)]
    filter_date_on: Option<String>,
    #[serde(default)]
    filter_date_during: Option<String>,
    #[serde(default)]
    filter_threads_only: bool,
    #[serde(default)]
    limit: Option<u16>,
    #[serde(default)]
    cursor: Option<String>,
}

/// Handle `conversations_search_messages`.
///
/// Pagination is page-indexed because Slack's search API is; the cursor
/// is an opaque base64 wrapper around the next page number.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on validation or Slack failures.
pub async fn search(
    state: &Arc<AppState>,
    gateway: &Arc<SlackGateway>,
    args: serde_json::Map<String, serde_json::Value>,
    ct: &CancellationToken,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: SearchInput = parse_args("conversations_search_messages", args)?;
    let span = info_span!("conversations_search_messages");

    async move {
        let page = match input.cursor.as_deref() {
            Some(cursor) => decode_page_cursor(cursor)?,
            None => 1,
        };
        let count = input.limit.unwrap_or(DEFAULT_COUNT).clamp(1, MAX_COUNT);

        let filters = SearchFilters {
            in_channel: input.filter_in_channel.clone(),
            in_im_or_mpim: input.filter_in_im_or_mpim.clone(),
            users_with: input.filter_users_with.clone(),
            users_from: input.filter_users_from.clone(),
            date_before: input.filter_date_before.clone(),
            date_after: input.filter_date_after.clone(),
            date_on: input.filter_date_on.clone(),
            date_during: input.filter_date_during.clone(),
            threads_only: input.filter_threads_only,
        };

        let query = build_query(
            &state.cache,
            input.search_query.as_deref().unwrap_or_default(),
            &filters,
            Local::now().date_naive(),
        )
        .await?;
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "search needs a query or at least one filter".into(),
            ));
        }
        debug!(%query, page, "composed search query");

        let page_u16 = u16::try_from(page).unwrap_or(u16::MAX);
        let response = call_with_retry(
            &state.limiters.tier2_boost,
            ct,
            2,
            slack_retry_delay,
            || gateway.search_messages(&query, count, page_u16),
        )
        .await?;

        let next_cursor = if response.messages.paging.page < response.messages.paging.pages {
            Some(encode_page_cursor(page + 1))
        } else {
            None
        };

        let total = response.messages.matches.len();
        let rows: Vec<Vec<String>> = response
            .messages
            .matches
            .iter()
            .enumerate()
            .map(|(idx, matched)| {
                let cursor_cell = match (&next_cursor, idx + 1 == total) {
                    (Some(cursor), true) => cursor.clone(),
                    _ => String::new(),
                };
                vec![
                    matched.user.clone().unwrap_or_default(),
                    matched.username.clone().unwrap_or_default(),
                    matched.channel.id.clone(),
                    matched.channel.name.clone(),
                    matched.ts.clone(),
                    ts_to_rfc3339(&matched.ts).unwrap_or_default(),
                    matched.text.clone(),
                    cursor_cell,
                ]
            })
            .collect();

        Ok(CallToolResult::success(vec![Content::text(csv::render(
            &SEARCH_HEADER,
            &rows,
        ))]))
    }
    .instrument(span)
    .await
    .map_err(rmcp::ErrorData::from)
}
