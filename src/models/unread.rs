//! Unread-discovery result entities.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Routing class of a conversation, ordered by delivery priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Direct message.
    Dm,
    /// Multi-person direct message.
    GroupDm,
    /// Channel shared with another workspace.
    Partner,
    /// Ordinary in-workspace channel.
    Internal,
}

impl ChannelType {
    /// Numeric priority; lower sorts first.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Dm => 0,
            Self::GroupDm => 1,
            Self::Partner => 2,
            Self::Internal => 3,
        }
    }

    /// Parse a `channel_types` filter token.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dm" => Some(Self::Dm),
            "group_dm" => Some(Self::GroupDm),
            "partner" => Some(Self::Partner),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

impl Display for ChannelType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Dm => "dm",
            Self::GroupDm => "group_dm",
            Self::Partner => "partner",
            Self::Internal => "internal",
        };
        f.write_str(label)
    }
}

/// One conversation with unread activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnreadChannel {
    /// Channel ID.
    pub channel_id: String,
    /// Display name (`#name`, `@name`, or group-DM label).
    pub channel_name: String,
    /// Routing class.
    pub channel_type: ChannelType,
    /// Unread message count (backfilled when Slack reports only a flag).
    pub unread_count: u32,
    /// Viewer's last-read timestamp, verbatim.
    pub last_read: String,
    /// Latest message timestamp, verbatim.
    pub latest: String,
}
