//! Composition of Slack search queries from free text and structured
//! filter parameters.
//!
//! Tokens already carrying a known `key:value` filter are merged with the
//! structured parameters, channel and user references are resolved through
//! the workspace cache, and the result is recomposed in a fixed key order
//! so identical inputs always produce identical queries.

use chrono::NaiveDate;

use super::dates::{format_for_slack, parse_flexible};
use crate::cache::WorkspaceCache;
use crate::{AppError, Result};

/// Filter keys understood by Slack's search grammar, in composition order.
const FILTER_KEYS: [&str; 8] = ["is", "in", "from", "with", "before", "after", "on", "during"];

/// Structured filter parameters accepted by the search tool.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Restrict to a channel (`#name` or ID).
    pub in_channel: Option<String>,
    /// Restrict to a DM/group-DM with a user (`@handle` or ID).
    pub in_im_or_mpim: Option<String>,
    /// Messages in threads with a user.
    pub users_with: Option<String>,
    /// Messages authored by a user.
    pub users_from: Option<String>,
    /// Strictly before this date.
    pub date_before: Option<String>,
    /// Strictly after this date.
    pub date_after: Option<String>,
    /// Exactly on this date. Exclusive with every other date filter.
    pub date_on: Option<String>,
    /// During this period. Exclusive with before/after.
    pub date_during: Option<String>,
    /// Only threaded messages.
    pub threads_only: bool,
}

/// Compose the final query string.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` for malformed dates or conflicting
/// date filters, and `AppError::NotFound` for unresolvable references.
pub async fn build_query(
    cache: &WorkspaceCache,
    raw_query: &str,
    filters: &SearchFilters,
    today: NaiveDate,
) -> Result<String> {
    let mut free_text: Vec<String> = Vec::new();
    let mut pairs: Vec<(String, String)> = Vec::new();

    // ── Split the raw query into free text and embedded filters ──
    for token in raw_query.split_whitespace() {
        match token.split_once(':') {
            Some((key, value))
                if FILTER_KEYS.contains(&key) && !value.is_empty() =>
            {
                pairs.push((key.to_owned(), value.to_owned()));
            }
            _ => free_text.push(token.to_owned()),
        }
    }

    // ── Merge structured filters ─────────────────────────
    if filters.threads_only {
        pairs.push(("is".to_owned(), "thread".to_owned()));
    }
    if let Some(channel) = &filters.in_channel {
        pairs.push(("in".to_owned(), channel.clone()));
    }
    if let Some(user) = &filters.in_im_or_mpim {
        pairs.push(("in".to_owned(), user.clone()));
    }
    if let Some(user) = &filters.users_with {
        pairs.push(("with".to_owned(), user.clone()));
    }
    if let Some(user) = &filters.users_from {
        pairs.push(("from".to_owned(), user.clone()));
    }
    if let Some(date) = &filters.date_before {
        pairs.push(("before".to_owned(), date.clone()));
    }
    if let Some(date) = &filters.date_after {
        pairs.push(("after".to_owned(), date.clone()));
    }
    if let Some(date) = &filters.date_on {
        pairs.push(("on".to_owned(), date.clone()));
    }
    if let Some(date) = &filters.date_during {
        pairs.push(("during".to_owned(), date.clone()));
    }

    validate_date_combination(&pairs)?;

    // ── Resolve and normalise values ─────────────────────
    let mut resolved: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        let value = match key.as_str() {
            "in" => resolve_in_value(cache, &value).await?,
            "from" | "with" => resolve_user_value(cache, &value).await?,
            "before" | "after" | "on" | "during" => {
                format_for_slack(parse_flexible(&value, today)?)
            }
            _ => value,
        };
        if !resolved.contains(&(key.clone(), value.clone())) {
            resolved.push((key, value));
        }
    }

    // `after` must not postdate `before`.
    let after = resolved.iter().find(|(k, _)| k == "after");
    let before = resolved.iter().find(|(k, _)| k == "before");
    if let (Some((_, after)), Some((_, before))) = (after, before) {
        if after.as_str() > before.as_str() {
            return Err(AppError::InvalidInput(format!(
                "'after' date {after} is later than 'before' date {before}"
            )));
        }
    }

    // ── Recompose in fixed key order ─────────────────────
    let mut parts = free_text;
    for key in FILTER_KEYS {
        for (k, v) in &resolved {
            if k == key {
                parts.push(format!("{k}:{v}"));
            }
        }
    }

    Ok(parts.join(" "))
}

/// `on` excludes every other date filter; `during` excludes before/after.
fn validate_date_combination(pairs: &[(String, String)]) -> Result<()> {
    let has = |key: &str| pairs.iter().any(|(k, _)| k == key);

    if has("on") && (has("before") || has("after") || has("during")) {
        return Err(AppError::InvalidInput(
            "'on' cannot be combined with other date filters".into(),
        ));
    }
    if has("during") && (has("before") || has("after")) {
        return Err(AppError::InvalidInput(
            "'during' cannot be combined with 'before' or 'after'".into(),
        ));
    }
    Ok(())
}

/// Resolve an `in:` value: `#name` via the channels index, IDs directly,
/// `@handle` via the users index (DM search), bare names pass through.
async fn resolve_in_value(cache: &WorkspaceCache, value: &str) -> Result<String> {
    if let Some(name) = value.strip_prefix('#') {
        let reference = format!("#{name}");
        return match cache.channels.resolve_ref(&reference).await {
            Some(_) => Ok(name.to_owned()),
            None => Err(AppError::NotFound(format!("channel '{reference}'"))),
        };
    }
    if value.starts_with('@') {
        return resolve_user_value(cache, value).await;
    }
    if crate::models::channel::Channel::looks_like_id(value) {
        return Ok(value.to_owned());
    }
    // A bare channel name; Slack accepts it as-is.
    Ok(value.to_owned())
}

/// Resolve a user value: `@handle` via the users index, IDs wrapped in
/// Slack's `<@U…>` reference form, anything else rejected.
async fn resolve_user_value(cache: &WorkspaceCache, value: &str) -> Result<String> {
    if let Some(handle) = value.strip_prefix('@') {
        return match cache.users.id_for_handle(handle).await {
            Some(id) => Ok(format!("<@{id}>")),
            None => Err(AppError::NotFound(format!("user '@{handle}'"))),
        };
    }
    if value.starts_with('U') || value.starts_with('W') {
        return Ok(format!("<@{value}>"));
    }
    Err(AppError::InvalidInput(format!(
        "user filter '{value}' must be an @handle or a user ID"
    )))
}
