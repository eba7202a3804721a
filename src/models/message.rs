//! Normalised message entity emitted by the conversation handlers.

use serde::{Deserialize, Serialize};

/// A single emoji reaction tally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    /// Emoji name without colons.
    pub name: String,
    /// Number of reactors.
    pub count: u32,
}

/// A message as surfaced to the MCP client.
///
/// Slack `ts` values are preserved verbatim (`"<seconds>.<microseconds>"`)
/// for round-trip correctness.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Channel the message belongs to.
    pub channel: String,
    /// Slack timestamp, verbatim.
    pub ts: String,
    /// Parent thread timestamp, when threaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    /// Author user ID; empty for some bot messages.
    #[serde(default)]
    pub user: String,
    /// Message text.
    #[serde(default)]
    pub text: String,
    /// Slack subtype; empty for ordinary messages.
    #[serde(default)]
    pub subtype: String,
    /// Reaction tallies.
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Activity messages are metadata events Slack injects into the stream
    /// (`channel_join`, `channel_leave`, `bot_add`, …). They are elided
    /// from responses unless explicitly requested.
    #[must_use]
    pub fn is_activity(&self) -> bool {
        !self.subtype.is_empty()
            && self.subtype != "bot_message"
            && self.subtype != "thread_broadcast"
    }

    /// Reactions flattened to `name(count)` joined by spaces.
    #[must_use]
    pub fn reactions_summary(&self) -> String {
        self.reactions
            .iter()
            .map(|r| format!("{}({})", r.name, r.count))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render the Slack `ts` seconds part as an RFC 3339 wall-clock string.
    /// Returns an empty string for a malformed timestamp.
    #[must_use]
    pub fn ts_as_rfc3339(&self) -> String {
        ts_to_rfc3339(&self.ts).unwrap_or_default()
    }
}

/// Convert a Slack `"<seconds>.<microseconds>"` timestamp to RFC 3339.
#[must_use]
pub fn ts_to_rfc3339(ts: &str) -> Option<String> {
    let seconds = ts.split('.').next()?.parse::<i64>().ok()?;
    let time = chrono::DateTime::from_timestamp(seconds, 0)?;
    Some(time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

/// Validate the `"<seconds>.<microseconds>"` shape of a Slack timestamp.
#[must_use]
pub fn is_valid_ts(ts: &str) -> bool {
    let Some((secs, micros)) = ts.split_once('.') else {
        return false;
    };
    !secs.is_empty()
        && !micros.is_empty()
        && secs.chars().all(|c| c.is_ascii_digit())
        && micros.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn activity_detection() {
        let mut msg = Message::default();
        assert!(!msg.is_activity());
        msg.subtype = "channel_join".into();
        assert!(msg.is_activity());
        msg.subtype = "bot_message".into();
        assert!(!msg.is_activity());
        msg.subtype = "thread_broadcast".into();
        assert!(!msg.is_activity());
    }

    #[test]
    fn ts_validation() {
        assert!(is_valid_ts("1736510400.000000"));
        assert!(!is_valid_ts("1736510400"));
        assert!(!is_valid_ts("abc.def"));
        assert!(!is_valid_ts(".123"));
    }

    #[test]
    fn ts_rendering() {
        assert_eq!(ts_to_rfc3339("0.000000").as_deref(), Some("1970-01-01T00:00:00Z"));
        assert!(ts_to_rfc3339("garbage").is_none());
    }
}
