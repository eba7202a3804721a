//! Slack token classification.
//!
//! Tokens are opaque strings whose prefix determines the authentication
//! mode and therefore which API surface is reachable.

use std::fmt::{Display, Formatter};

/// Kind of Slack token, derived from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Browser-session token (`xoxc-`). Requires a paired `xoxd` cookie.
    Session,
    /// User OAuth token (`xoxp-`).
    UserOauth,
    /// Bot OAuth token (`xoxb-`).
    BotOauth,
    /// Browser cookie (`xoxd-`). Never presented alone.
    Cookie,
}

impl TokenKind {
    /// Detect the token kind from its prefix. Returns `None` for anything
    /// that is not a Slack token (e.g. an opaque MCP bearer).
    #[must_use]
    pub fn detect(token: &str) -> Option<Self> {
        if token.starts_with("xoxc-") {
            Some(Self::Session)
        } else if token.starts_with("xoxp-") {
            Some(Self::UserOauth)
        } else if token.starts_with("xoxb-") {
            Some(Self::BotOauth)
        } else if token.starts_with("xoxd-") {
            Some(Self::Cookie)
        } else {
            None
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Session => "xoxc",
            Self::UserOauth => "xoxp",
            Self::BotOauth => "xoxb",
            Self::Cookie => "xoxd",
        };
        f.write_str(label)
    }
}

/// Credentials resolved from the environment (or a per-request bearer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCredentials {
    /// Browser-session pair: `xoxc` token plus `xoxd` cookie.
    EdgeSession {
        /// The `xoxc-` session token.
        token: String,
        /// The `xoxd-` cookie value.
        cookie: String,
    },
    /// User OAuth token (`xoxp-`).
    UserOauth {
        /// The `xoxp-` token.
        token: String,
    },
    /// Bot OAuth token (`xoxb-`). Disables search and unread discovery.
    BotOauth {
        /// The `xoxb-` token.
        token: String,
    },
    /// No process-wide credentials; requests must carry their own token.
    None,
}

impl AuthCredentials {
    /// The bearer token presented to Slack, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        match self {
            Self::EdgeSession { token, .. }
            | Self::UserOauth { token }
            | Self::BotOauth { token } => Some(token),
            Self::None => None,
        }
    }

    /// Token kind of the configured credentials.
    #[must_use]
    pub const fn kind(&self) -> Option<TokenKind> {
        match self {
            Self::EdgeSession { .. } => Some(TokenKind::Session),
            Self::UserOauth { .. } => Some(TokenKind::UserOauth),
            Self::BotOauth { .. } => Some(TokenKind::BotOauth),
            Self::None => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_prefixes() {
        assert_eq!(TokenKind::detect("xoxc-123"), Some(TokenKind::Session));
        assert_eq!(TokenKind::detect("xoxp-123"), Some(TokenKind::UserOauth));
        assert_eq!(TokenKind::detect("xoxb-123"), Some(TokenKind::BotOauth));
        assert_eq!(TokenKind::detect("xoxd-123"), Some(TokenKind::Cookie));
    }

    #[test]
    fn opaque_bearer_is_not_a_slack_token() {
        assert_eq!(TokenKind::detect("mcp-abcdef"), None);
        assert_eq!(TokenKind::detect(""), None);
        assert_eq!(TokenKind::detect("xox"), None);
    }
}
