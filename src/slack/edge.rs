//! Wire types for the undocumented edge endpoints.
//!
//! These are the calls the Slack web client makes (`client.counts`,
//! `users.prefs.get`, `users/search`, `search.modules.channels`,
//! `slackLists.items.list`). They only answer to browser-session tokens;
//! the gateway refuses to send them with OAuth credentials.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

/// One conversation entry in `client.counts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountsEntry {
    /// Channel ID.
    pub id: String,
    /// Whether the viewer has unread messages here.
    #[serde(default)]
    pub has_unreads: bool,
    /// Number of mentions of the viewer.
    #[serde(default)]
    pub mention_count: u32,
    /// Viewer's last-read timestamp.
    #[serde(default)]
    pub last_read: String,
    /// Latest message timestamp.
    #[serde(default)]
    pub latest: String,
}

/// `client.counts` response: per-kind arrays of unread state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientCountsResponse {
    /// Ordinary channels.
    #[serde(default)]
    pub channels: Vec<CountsEntry>,
    /// Group DMs.
    #[serde(default)]
    pub mpims: Vec<CountsEntry>,
    /// Direct messages.
    #[serde(default)]
    pub ims: Vec<CountsEntry>,
}

/// `users.prefs.get` response; only the notification prefs are consumed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersPrefsResponse {
    /// Raw prefs object.
    #[serde(default)]
    pub prefs: PrefsBlob,
}

/// The prefs fields this server reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrefsBlob {
    /// JSON-encoded string *containing* JSON describing per-channel
    /// notification preferences.
    #[serde(default)]
    pub all_notifications_prefs: String,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationPrefs {
    #[serde(default)]
    channels: HashMap<String, ChannelPrefs>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelPrefs {
    #[serde(default)]
    muted: bool,
}

/// Decode the muted-channel set out of `all_notifications_prefs`.
///
/// The field is a JSON string containing JSON. Slack has silently evolved
/// this format before, so a malformed inner payload is treated as "no muted
/// channels" rather than an error.
#[must_use]
pub fn parse_muted_channels(all_notifications_prefs: &str) -> HashMap<String, bool> {
    if all_notifications_prefs.is_empty() {
        return HashMap::new();
    }
    match serde_json::from_str::<NotificationPrefs>(all_notifications_prefs) {
        Ok(prefs) => prefs
            .channels
            .into_iter()
            .map(|(id, p)| (id, p.muted))
            .collect(),
        Err(err) => {
            warn!(%err, "unparseable all_notifications_prefs; assuming no muted channels");
            HashMap::new()
        }
    }
}

/// Edge `users/search` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgeUsersSearchResponse {
    /// Matching users.
    #[serde(default)]
    pub results: Vec<super::api::WireUser>,
}

/// One channel module returned by `search.modules.channels`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelModuleItem {
    /// Channel ID.
    #[serde(default)]
    pub id: String,
    /// Channel name.
    #[serde(default)]
    pub name: String,
}

/// `search.modules.channels` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchChannelsResponse {
    /// Matching channels.
    #[serde(default)]
    pub items: Vec<ChannelModuleItem>,
}

/// `slackLists.items.list` response; items are passed through untyped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListItemsResponse {
    /// List rows, shape owned by Slack.
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}
