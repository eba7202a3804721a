//! Process configuration resolved from environment variables.
//!
//! Static settings (tokens, bind address, TLS trust, cache paths) are read
//! once at startup into a [`Config`] snapshot. Per-write-tool policy
//! variables are intentionally *not* snapshotted — handlers read them per
//! invocation so operators can adjust policy without a restart.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::slack::token::AuthCredentials;
use crate::{AppError, Result};

/// Prefix shared by every environment variable this server reads.
pub const ENV_PREFIX: &str = "SLACK_MCP_";

/// Versioned channels cache file name. The version suffix keeps an older
/// process from silently reading an incompatible newer snapshot.
pub const CHANNELS_CACHE_FILE: &str = "channels_cache_v2.json";

/// Users cache file name (unversioned).
pub const USERS_CACHE_FILE: &str = "users_cache.json";

/// Read a `SLACK_MCP_*` variable, treating empty values as unset.
#[must_use]
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Whether a policy-style env value means "enabled, any channel".
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Process-wide configuration snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credentials resolved from token env vars.
    pub auth: AuthCredentials,
    /// Bind host for SSE/HTTP transports.
    pub host: String,
    /// Bind port for SSE/HTTP transports.
    pub port: u16,
    /// Static MCP bearer token for SSE/HTTP. `None` disables auth.
    pub api_key: Option<String>,
    /// Outbound HTTP proxy URL.
    pub proxy: Option<String>,
    /// Custom User-Agent for enterprise workspaces.
    pub user_agent: Option<String>,
    /// Browser-shaped TLS profile for enterprise workspaces.
    pub custom_tls: bool,
    /// Path to an extra root certificate to trust.
    pub server_ca: Option<PathBuf>,
    /// Also trust the OS certificate store alongside `server_ca`.
    pub server_ca_toolkit: bool,
    /// Disable TLS verification entirely. Logged loudly at startup.
    pub server_ca_insecure: bool,
    /// Use `slack-gov.com` instead of `slack.com` as the base domain.
    pub govslack: bool,
    /// On-disk users cache location.
    pub users_cache_path: PathBuf,
    /// On-disk channels cache location (v2 format).
    pub channels_cache_path: PathBuf,
    /// Explicit tool allowlist. Empty means "all tools, subject to
    /// per-tool enable vars".
    pub enabled_tools: Vec<String>,
}

impl Config {
    /// Build the configuration snapshot from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid token combination, a bad
    /// port value, or an unknown tool name in `SLACK_MCP_ENABLED_TOOLS`.
    pub fn from_env() -> Result<Self> {
        let auth = resolve_credentials()?;

        let port = match env_var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|err| AppError::Config(format!("invalid SLACK_MCP_PORT '{raw}': {err}")))?,
            None => 13080,
        };
        let host = env_var("HOST").unwrap_or_else(|| "127.0.0.1".to_owned());

        let enabled_tools = match env_var("ENABLED_TOOLS") {
            Some(raw) => {
                let tools: Vec<String> = raw
                    .split(',')
                    .map(|t| t.trim().to_owned())
                    .filter(|t| !t.is_empty())
                    .collect();
                for tool in &tools {
                    if !crate::mcp::registry::is_valid_tool(tool) {
                        return Err(AppError::Config(format!(
                            "unknown tool '{tool}' in SLACK_MCP_ENABLED_TOOLS"
                        )));
                    }
                }
                tools
            }
            None => Vec::new(),
        };

        let cache_dir = default_cache_dir();
        let users_cache_path = env_var("USERS_CACHE")
            .map_or_else(|| cache_dir.join(USERS_CACHE_FILE), PathBuf::from);
        let channels_cache_path = env_var("CHANNELS_CACHE")
            .map_or_else(|| cache_dir.join(CHANNELS_CACHE_FILE), PathBuf::from);

        Ok(Self {
            auth,
            host,
            port,
            api_key: env_var("API_KEY"),
            proxy: env_var("PROXY"),
            user_agent: env_var("USER_AGENT"),
            custom_tls: env_var("CUSTOM_TLS").is_some_and(|v| is_truthy(&v)),
            server_ca: env_var("SERVER_CA").map(PathBuf::from),
            server_ca_toolkit: env_var("SERVER_CA_TOOLKIT").is_some_and(|v| is_truthy(&v)),
            server_ca_insecure: env_var("SERVER_CA_INSECURE").is_some_and(|v| is_truthy(&v)),
            govslack: env_var("GOVSLACK").is_some_and(|v| is_truthy(&v)),
            users_cache_path,
            channels_cache_path,
            enabled_tools,
        })
    }

    /// Base domain for all Slack calls.
    #[must_use]
    pub fn base_domain(&self) -> &'static str {
        if self.govslack {
            "slack-gov.com"
        } else {
            "slack.com"
        }
    }

    /// Whether the process has its own Slack credentials. When false, only
    /// per-request tokens (SSE/HTTP) can reach Slack.
    #[must_use]
    pub fn has_process_credentials(&self) -> bool {
        !matches!(self.auth, AuthCredentials::None)
    }
}

/// Resolve token env vars into [`AuthCredentials`].
///
/// Precedence mirrors the documented setup paths: browser session first,
/// then user OAuth, then bot OAuth.
fn resolve_credentials() -> Result<AuthCredentials> {
    let xoxc = env_var("XOXC_TOKEN");
    let xoxd = env_var("XOXD_TOKEN");

    match (xoxc, xoxd) {
        (Some(token), Some(cookie)) => {
            if !token.starts_with("xoxc-") {
                return Err(AppError::Config(
                    "SLACK_MCP_XOXC_TOKEN must start with 'xoxc-'".into(),
                ));
            }
            return Ok(AuthCredentials::EdgeSession { token, cookie });
        }
        (Some(_), None) => {
            return Err(AppError::Config(
                "SLACK_MCP_XOXC_TOKEN requires SLACK_MCP_XOXD_TOKEN to be set as well".into(),
            ));
        }
        (None, Some(_)) => {
            return Err(AppError::Config(
                "SLACK_MCP_XOXD_TOKEN requires SLACK_MCP_XOXC_TOKEN to be set as well".into(),
            ));
        }
        (None, None) => {}
    }

    if let Some(token) = env_var("XOXP_TOKEN") {
        if !token.starts_with("xoxp-") {
            return Err(AppError::Config(
                "SLACK_MCP_XOXP_TOKEN must start with 'xoxp-'".into(),
            ));
        }
        return Ok(AuthCredentials::UserOauth { token });
    }

    if let Some(token) = env_var("XOXB_TOKEN") {
        if !token.starts_with("xoxb-") {
            return Err(AppError::Config(
                "SLACK_MCP_XOXB_TOKEN must start with 'xoxb-'".into(),
            ));
        }
        return Ok(AuthCredentials::BotOauth { token });
    }

    Ok(AuthCredentials::None)
}

/// OS-appropriate cache directory for this server.
fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "slack-conduit")
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.cache_dir().to_path_buf())
}
