//! MCP-issued token entities held by the auth boundary.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Maximum lifetime of an issued MCP access token.
pub const TOKEN_TTL_DAYS: i64 = 90;

/// Maximum lifetime of an OAuth CSRF state.
pub const STATE_TTL_MINUTES: i64 = 10;

/// An MCP-issued access token mapping to a stored Slack token.
///
/// Held in process memory only; a restart invalidates all issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenInfo {
    /// The opaque bearer presented by the MCP client.
    pub mcp_token: String,
    /// The Slack token this bearer maps to, when one was captured.
    pub slack_token: Option<String>,
    /// Slack user the token belongs to.
    pub user_id: String,
    /// Slack workspace the token belongs to.
    pub team_id: String,
    /// Hard expiry; enforced by the periodic cleanup task.
    pub expires_at: DateTime<Utc>,
    /// OAuth scopes granted to the underlying Slack token.
    pub scopes: Vec<String>,
}

impl TokenInfo {
    /// Construct a token record expiring after the standard TTL.
    #[must_use]
    pub fn new(
        mcp_token: String,
        slack_token: Option<String>,
        user_id: String,
        team_id: String,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            mcp_token,
            slack_token,
            user_id,
            team_id,
            expires_at: Utc::now() + Duration::days(TOKEN_TTL_DAYS),
            scopes,
        }
    }

    /// Whether the token has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A short-lived CSRF state issued during the OAuth browser flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfState {
    /// Random state value.
    pub state: String,
    /// Expiry; states older than ten minutes are swept.
    pub expires_at: DateTime<Utc>,
}

impl CsrfState {
    /// Construct a state record expiring after the standard TTL.
    #[must_use]
    pub fn new(state: String) -> Self {
        Self {
            state,
            expires_at: Utc::now() + Duration::minutes(STATE_TTL_MINUTES),
        }
    }

    /// Issue a fresh random state for a new OAuth flow.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}
