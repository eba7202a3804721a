//! Channel entity and display-name rules.

use serde::{Deserialize, Serialize};

/// A conversation: public or private channel, DM, or group DM.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Slack channel ID (`C…`, `G…`, `D…`).
    pub id: String,
    /// Raw channel name; empty for IMs.
    #[serde(default)]
    pub name: String,
    /// Channel topic.
    #[serde(default)]
    pub topic: String,
    /// Channel purpose.
    #[serde(default)]
    pub purpose: String,
    /// Member count as reported by Slack.
    #[serde(default)]
    pub member_count: u32,
    /// Private channel or group.
    #[serde(default)]
    pub is_private: bool,
    /// Direct message.
    #[serde(default)]
    pub is_im: bool,
    /// Multi-person direct message.
    #[serde(default)]
    pub is_mpim: bool,
    /// Shared with another workspace.
    #[serde(default)]
    pub is_ext_shared: bool,
    /// For IMs, the counterparty user ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Viewer's last-read timestamp, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read: Option<String>,
}

impl Channel {
    /// Display name under the `#name` / `@name` convention.
    ///
    /// IMs resolve to `@<counterparty login>` via the supplied lookup; an
    /// unresolvable counterparty falls back to `@<user id>` until a later
    /// users refresh fills it in. Group DMs keep their raw label.
    #[must_use]
    pub fn display_name(&self, resolve_user: impl Fn(&str) -> Option<String>) -> String {
        if self.is_im {
            let counterparty = self.user.as_deref().unwrap_or(self.id.as_str());
            let handle = resolve_user(counterparty).unwrap_or_else(|| counterparty.to_owned());
            format!("@{handle}")
        } else if self.is_mpim {
            self.name.clone()
        } else {
            format!("#{}", self.name)
        }
    }

    /// Whether the string looks like a channel ID rather than a reference.
    #[must_use]
    pub fn looks_like_id(value: &str) -> bool {
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        matches!(first, 'C' | 'G' | 'D' | 'S')
            && value.len() > 1
            && chars.all(|c| c.is_ascii_alphanumeric())
    }
}
