//! Auth boundary for the SSE/HTTP transports.
//!
//! Per-request bearers are sniffed by token prefix: a Slack token builds
//! (or reuses from an LRU) its own gateway and bypasses MCP API-key
//! validation; an opaque bearer is looked up in the MCP token store; the
//! rest is validated against the static API key with a constant-time
//! comparison. With no API key configured and no token match, requests
//! are allowed through — authentication disabled is logged, not an error.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::auth::{CsrfState, TokenInfo};
use crate::slack::gateway::SlackGateway;
use crate::slack::http::NetOptions;
use crate::slack::token::TokenKind;
use crate::{AppError, Result};

/// Maximum per-request gateways kept alive.
const CLIENT_LRU_CAPACITY: usize = 64;

/// Sweep interval for expired tokens and CSRF states.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// How a request was authenticated.
#[derive(Debug, Clone)]
pub enum RequestAuth {
    /// The bearer was a Slack token; the request gets its own gateway.
    SlackToken(Arc<SlackGateway>),
    /// The bearer matched an issued MCP token.
    McpToken {
        /// Gateway built from the stored Slack token, when one exists.
        gateway: Option<Arc<SlackGateway>>,
    },
    /// The bearer matched the static API key.
    ApiKey,
    /// No authentication is configured; the request proceeds.
    Open,
}

/// In-memory store of MCP-issued tokens and OAuth CSRF states.
///
/// The OAuth browser flow's only contract with this layer is "produce a
/// [`TokenInfo`] and hand it to the store".
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, TokenInfo>>,
    states: RwLock<HashMap<String, CsrfState>>,
}

impl TokenStore {
    /// Register an issued token.
    pub fn insert_token(&self, info: TokenInfo) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(info.mcp_token.clone(), info);
        }
    }

    /// Look up a bearer, ignoring expired entries.
    #[must_use]
    pub fn lookup(&self, bearer: &str) -> Option<TokenInfo> {
        let tokens = self.tokens.read().ok()?;
        let info = tokens.get(bearer)?;
        if info.is_expired(Utc::now()) {
            return None;
        }
        Some(info.clone())
    }

    /// Register a CSRF state for the OAuth flow.
    pub fn insert_state(&self, state: CsrfState) {
        if let Ok(mut states) = self.states.write() {
            states.insert(state.state.clone(), state);
        }
    }

    /// Consume a CSRF state; expired states fail.
    #[must_use]
    pub fn consume_state(&self, value: &str) -> bool {
        let Ok(mut states) = self.states.write() else {
            return false;
        };
        match states.remove(value) {
            Some(state) => Utc::now() < state.expires_at,
            None => false,
        }
    }

    /// Drop expired tokens and states.
    pub fn sweep(&self) {
        let now = Utc::now();
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.retain(|_, info| !info.is_expired(now));
        }
        if let Ok(mut states) = self.states.write() {
            states.retain(|_, state| now < state.expires_at);
        }
    }

    /// Number of live tokens (for tests and logging).
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.read().map(|t| t.len()).unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct LruInner {
    map: HashMap<String, Arc<SlackGateway>>,
    order: VecDeque<String>,
}

/// The auth boundary: token store, per-token gateway LRU, and the static
/// API key.
#[derive(Debug)]
pub struct AuthRegistry {
    /// Issued-token store.
    pub store: Arc<TokenStore>,
    clients: Mutex<LruInner>,
    net: NetOptions,
    api_key: Option<String>,
}

impl AuthRegistry {
    /// Build the registry from the configuration snapshot.
    #[must_use]
    pub fn new(config: &crate::config::Config) -> Self {
        if config.api_key.is_none() {
            warn!("no SLACK_MCP_API_KEY configured; SSE/HTTP authentication is disabled");
        }
        Self {
            store: Arc::new(TokenStore::default()),
            clients: Mutex::new(LruInner::default()),
            net: NetOptions::from_config(config),
            api_key: config.api_key.clone(),
        }
    }

    /// Authorize a request bearer (already stripped of `Bearer `).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Policy` for a bearer that matches nothing while
    /// an API key is configured, and `AppError::Config` when a sniffed
    /// Slack token cannot be turned into a gateway.
    pub fn authorize(&self, bearer: Option<&str>) -> Result<RequestAuth> {
        if let Some(bearer) = bearer {
            if TokenKind::detect(bearer).is_some() {
                let gateway = self.gateway_for_token(bearer)?;
                return Ok(RequestAuth::SlackToken(gateway));
            }

            if let Some(info) = self.store.lookup(bearer) {
                let gateway = match info.slack_token.as_deref() {
                    Some(token) => Some(self.gateway_for_token(token)?),
                    None => None,
                };
                return Ok(RequestAuth::McpToken { gateway });
            }

            if let Some(api_key) = &self.api_key {
                if constant_time_eq(bearer, api_key) {
                    return Ok(RequestAuth::ApiKey);
                }
                return Err(AppError::Policy("invalid API key".into()));
            }
        } else if self.api_key.is_some() {
            return Err(AppError::Policy("missing Authorization header".into()));
        }

        debug!("request allowed without authentication");
        Ok(RequestAuth::Open)
    }

    /// Build or reuse the gateway for a per-request Slack token. Entries
    /// are keyed by token fingerprint and created once.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the token cannot back a gateway.
    pub fn gateway_for_token(&self, token: &str) -> Result<Arc<SlackGateway>> {
        let key = fingerprint(token);

        let mut lru = self
            .clients
            .lock()
            .map_err(|_| AppError::Config("client cache poisoned".into()))?;

        if let Some(gateway) = lru.map.get(&key) {
            let gateway = Arc::clone(gateway);
            lru.order.retain(|k| k != &key);
            lru.order.push_back(key);
            return Ok(gateway);
        }

        let gateway = Arc::new(SlackGateway::from_bearer(token, &self.net)?);
        lru.map.insert(key.clone(), Arc::clone(&gateway));
        lru.order.push_back(key);

        while lru.order.len() > CLIENT_LRU_CAPACITY {
            if let Some(evicted) = lru.order.pop_front() {
                lru.map.remove(&evicted);
            }
        }

        info!(kind = %gateway.kind(), "built per-request slack gateway");
        Ok(gateway)
    }

    /// Spawn the periodic cleanup of expired tokens and states.
    pub fn spawn_cleanup(&self, ct: CancellationToken) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => store.sweep(),
                    () = ct.cancelled() => break,
                }
            }
        })
    }
}

/// SHA-256 fingerprint used as the LRU key so raw tokens never sit in the
/// map's keys.
#[must_use]
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Constant-time equality via fixed-length digests: the comparison cost
/// depends only on the hash width, not on where the inputs differ.
#[must_use]
pub fn constant_time_eq(left: &str, right: &str) -> bool {
    let left = Sha256::digest(left.as_bytes());
    let right = Sha256::digest(right.as_bytes());
    left.iter()
        .zip(right.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
