//! Pure filtering, priority, and budget rules for unread discovery.
//!
//! Kept free of I/O so the ordering and filtering invariants are directly
//! testable: the priority sort is stable and independent of API response
//! ordering, and budgets are deterministic for identical inputs.

use std::collections::HashMap;

use crate::models::unread::{ChannelType, UnreadChannel};
use crate::slack::edge::CountsEntry;

/// One `client.counts` entry annotated with what the cache knows.
#[derive(Debug, Clone)]
pub struct EdgeCandidate {
    /// The raw counts entry.
    pub entry: CountsEntry,
    /// Routing class resolved from the cache.
    pub channel_type: ChannelType,
    /// Display name resolved from the cache (raw ID when unknown).
    pub display_name: String,
}

/// Apply the mute, mention, and type filters to edge candidates.
///
/// Entries without unreads never survive. The mute filter only applies
/// when a muted set was actually fetched.
#[must_use]
pub fn filter_candidates(
    candidates: Vec<EdgeCandidate>,
    muted: Option<&HashMap<String, bool>>,
    mentions_only: bool,
    type_filter: Option<ChannelType>,
) -> Vec<EdgeCandidate> {
    candidates
        .into_iter()
        .filter(|candidate| {
            if !candidate.entry.has_unreads {
                return false;
            }
            if let Some(muted) = muted {
                if muted.get(&candidate.entry.id).copied().unwrap_or(false) {
                    return false;
                }
            }
            if mentions_only && candidate.entry.mention_count == 0 {
                return false;
            }
            if let Some(wanted) = type_filter {
                if candidate.channel_type != wanted {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Stable priority sort: DMs first, then group DMs, partner, internal.
pub fn sort_by_priority(channels: &mut [UnreadChannel]) {
    channels.sort_by_key(|c| c.channel_type.priority());
}

/// Stable priority sort for edge candidates.
pub fn sort_candidates(candidates: &mut [EdgeCandidate]) {
    candidates.sort_by_key(|c| c.channel_type.priority());
}

/// Per-type scan budget for the OAuth fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupBudget {
    /// `types` parameter for `users.conversations`.
    pub types: &'static str,
    /// Unread-channel quota for this group.
    pub quota: usize,
    /// Maximum channels scanned while filling the quota.
    pub scan_cap: usize,
}

/// Fixed budget allocation: DMs get the full quota, group DMs and
/// channels half each. Scan caps are twice the quota with a floor of 50.
#[must_use]
pub fn fallback_budgets(max_channels: usize) -> [GroupBudget; 3] {
    let half = (max_channels / 2).max(1);
    [
        GroupBudget {
            types: "im",
            quota: max_channels.max(1),
            scan_cap: (max_channels * 2).max(50),
        },
        GroupBudget {
            types: "mpim",
            quota: half,
            scan_cap: (half * 2).max(50),
        },
        GroupBudget {
            types: "public_channel,private_channel",
            quota: half,
            scan_cap: (half * 2).max(50),
        },
    ]
}

/// Slack's "never visited" sentinel values for `last_read`.
#[must_use]
pub fn never_visited(last_read: Option<&str>) -> bool {
    matches!(last_read, None | Some("") | Some("0000000000.000000"))
}

/// Header note summarising an OAuth fallback scan so the client knows the
/// results may be partial.
#[must_use]
pub fn fallback_note(scanned: usize, api_calls: usize, rate_limit_skips: usize) -> String {
    format!(
        "Unread discovery used the xoxp token fallback: scanned {scanned} conversation(s) \
         with {api_calls} API call(s); {rate_limit_skips} skipped due to rate limits. \
         Results may be partial."
    )
}
