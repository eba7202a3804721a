//! Shared parameter parsing and cursor helpers for tool handlers.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Months, TimeZone};
use serde::de::DeserializeOwned;

use crate::models::message::Message;
use crate::models::user::User;
use crate::{AppError, Result};

/// Deserialize a tool's argument map into its input struct.
///
/// # Errors
///
/// Returns `invalid_params` with the serde message.
pub fn parse_args<T: DeserializeOwned>(
    tool: &str,
    args: serde_json::Map<String, serde_json::Value>,
) -> std::result::Result<T, rmcp::ErrorData> {
    serde_json::from_value(serde_json::Value::Object(args)).map_err(|err| {
        rmcp::ErrorData::invalid_params(format!("invalid {tool} parameters: {err}"), None)
    })
}

/// A parsed `limit` parameter: either a message count or a time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitSpec {
    /// Fetch this many messages.
    Count(u16),
    /// Fetch everything between two Slack timestamps.
    Window {
        /// Lower bound (local midnight N days back).
        oldest: String,
        /// Upper bound (now).
        latest: String,
    },
}

/// Parse a `limit` that is either a count or a duration expression
/// (`Nd` / `Nw` / `Nm` — days, weeks, months). Duration windows run from
/// local midnight of the first covered day through `now`, where the window
/// covers N calendar days (weeks, months) including today.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` for anything else.
pub fn parse_limit<Tz: TimeZone>(raw: &str, now: &DateTime<Tz>) -> Result<LimitSpec> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.is_ascii() {
        return Err(AppError::InvalidInput(format!("invalid limit '{raw}'")));
    }

    if let Ok(count) = raw.parse::<u16>() {
        if count == 0 {
            return Err(AppError::InvalidInput("limit must be positive".into()));
        }
        return Ok(LimitSpec::Count(count.min(999)));
    }

    let (digits, unit) = raw.split_at(raw.len() - 1);
    let amount: u32 = digits
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("invalid limit '{raw}'")))?;
    if amount == 0 {
        return Err(AppError::InvalidInput("limit duration must be positive".into()));
    }

    let today = now.date_naive();
    let start = match unit {
        "d" => today - chrono::Duration::days(i64::from(amount) - 1),
        "w" => today - chrono::Duration::days(i64::from(amount) * 7 - 1),
        "m" => today
            .checked_sub_months(Months::new(amount))
            .map(|d| d + chrono::Duration::days(1))
            .ok_or_else(|| AppError::InvalidInput(format!("invalid limit '{raw}'")))?,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "invalid limit '{raw}': use a count or Nd/Nw/Nm"
            )))
        }
    };

    let midnight = start
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest())
        .ok_or_else(|| AppError::InvalidInput(format!("invalid limit '{raw}'")))?;

    Ok(LimitSpec::Window {
        oldest: format!("{}.000000", midnight.timestamp()),
        latest: format!(
            "{}.{:06}",
            now.timestamp(),
            now.timestamp_subsec_micros()
        ),
    })
}

/// Encode the opaque search cursor for a 1-based page number.
#[must_use]
pub fn encode_page_cursor(page: u32) -> String {
    BASE64.encode(format!("page:{page}"))
}

/// Decode an opaque search cursor back into its page number.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` for cursors this server never issued.
pub fn decode_page_cursor(cursor: &str) -> Result<u32> {
    let bytes = BASE64
        .decode(cursor.trim())
        .map_err(|_| AppError::InvalidInput("malformed cursor".into()))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| AppError::InvalidInput("malformed cursor".into()))?;
    let page = text
        .strip_prefix("page:")
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or_else(|| AppError::InvalidInput("malformed cursor".into()))?;
    if page == 0 {
        return Err(AppError::InvalidInput("malformed cursor".into()));
    }
    Ok(page)
}

/// Encode the opaque listing cursor for a last-seen key.
#[must_use]
pub fn encode_key_cursor(key: &str) -> String {
    BASE64.encode(key)
}

/// Decode an opaque listing cursor back into its last-seen key.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` for cursors this server never issued.
pub fn decode_key_cursor(cursor: &str) -> Result<String> {
    let bytes = BASE64
        .decode(cursor.trim())
        .map_err(|_| AppError::InvalidInput("malformed cursor".into()))?;
    String::from_utf8(bytes).map_err(|_| AppError::InvalidInput("malformed cursor".into()))
}

/// Column set for message CSV tables.
pub const MESSAGE_HEADER: [&str; 9] = [
    "user_id",
    "user_name",
    "channel",
    "ts",
    "thread_ts",
    "time",
    "text",
    "reactions",
    "cursor",
];

/// Render messages into CSV rows, attaching `next_cursor` to the last row.
#[must_use]
pub fn message_rows(
    messages: &[Message],
    lookup: impl Fn(&str) -> Option<User>,
    next_cursor: Option<&str>,
) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = messages
        .iter()
        .map(|message| {
            let user_name = lookup(&message.user)
                .map(|u| u.label().to_owned())
                .unwrap_or_default();
            vec![
                message.user.clone(),
                user_name,
                message.channel.clone(),
                message.ts.clone(),
                message.thread_ts.clone().unwrap_or_default(),
                message.ts_as_rfc3339(),
                message.text.clone(),
                message.reactions_summary(),
                String::new(),
            ]
        })
        .collect();

    if let (Some(cursor), Some(last)) = (next_cursor, rows.last_mut()) {
        if let Some(cell) = last.last_mut() {
            cursor.clone_into(cell);
        }
    }

    rows
}
