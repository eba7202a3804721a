//! Error types shared across the application.

use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Configuration parsing or validation failure. Fatal at startup.
    Config(String),
    /// Slack API failure, tagged with the originating endpoint.
    Slack {
        /// API method that produced the error (e.g. `conversations.history`).
        endpoint: String,
        /// Slack error string or transport detail.
        message: String,
    },
    /// Slack told us to slow down. Carries the advertised retry delay.
    RateLimited {
        /// Delay from the `Retry-After` header, if Slack sent one.
        retry_after: Option<Duration>,
    },
    /// Name-based lookups are unavailable while a cache sync is in flight.
    NotReady(String),
    /// Channel or user reference does not resolve.
    NotFound(String),
    /// A cache refresh triggered by a lookup miss was itself rate-limited.
    /// Distinguished from [`AppError::NotFound`] so callers can tell the
    /// user to retry later instead of fixing the reference.
    RefreshRateLimited(String),
    /// Write tool disabled or channel rejected by the allow/deny policy.
    Policy(String),
    /// Request parameter failed validation.
    InvalidInput(String),
    /// A configured resource limit was exceeded (e.g. attachment size).
    ResourceLimit(String),
    /// Operation is not available for the current token kind.
    Unsupported(String),
    /// MCP transport or bind failure.
    Transport(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// The request was cancelled before completion.
    Cancelled,
}

impl AppError {
    /// Construct an [`AppError::Slack`] with endpoint context.
    pub fn slack(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Slack {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a Slack rate-limit signal.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Slack { endpoint, message } => write!(f, "slack {endpoint}: {message}"),
            Self::RateLimited { retry_after } => match retry_after {
                Some(delay) => {
                    write!(f, "rate-limited by slack, retry after {}s", delay.as_secs())
                }
                None => write!(f, "rate-limited by slack"),
            },
            Self::NotReady(msg) => write!(f, "not ready: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::RefreshRateLimited(msg) => write!(
                f,
                "not found: {msg} (cache refresh was rate-limited, try again later)"
            ),
            Self::Policy(msg) => write!(f, "policy: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::ResourceLimit(msg) => write!(f, "resource limit: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(format!("json: {err}"))
    }
}

impl From<AppError> for rmcp::ErrorData {
    fn from(err: AppError) -> Self {
        match &err {
            AppError::InvalidInput(_) | AppError::NotFound(_) | AppError::RefreshRateLimited(_) => {
                Self::invalid_params(err.to_string(), None)
            }
            _ => Self::internal_error(err.to_string(), None),
        }
    }
}
