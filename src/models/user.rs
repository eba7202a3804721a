//! Workspace user entity.

use serde::{Deserialize, Serialize};

/// A workspace member. Identity is `id`; source of truth is `users.list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Slack user ID (`U…` / `W…`).
    pub id: String,
    /// Login handle.
    pub name: String,
    /// Full profile name.
    #[serde(default)]
    pub real_name: String,
    /// Preferred display name, often empty.
    #[serde(default)]
    pub display_name: String,
    /// Profile email, when the token may see it.
    #[serde(default)]
    pub email: String,
    /// Job title.
    #[serde(default)]
    pub title: String,
    /// Whether this is a bot user.
    #[serde(default)]
    pub is_bot: bool,
    /// Whether the account is deactivated.
    #[serde(default)]
    pub deleted: bool,
    /// IANA time zone, when Slack provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
}

impl User {
    /// Best human-readable name: display name, then real name, then handle.
    #[must_use]
    pub fn label(&self) -> &str {
        if !self.display_name.is_empty() {
            &self.display_name
        } else if !self.real_name.is_empty() {
            &self.real_name
        } else {
            &self.name
        }
    }
}
