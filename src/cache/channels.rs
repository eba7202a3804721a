//! Channels directory cache: id → channel plus the `#name`/`@name` index.
//!
//! The on-disk snapshot is versioned (`channels_cache_v2.json`); a file
//! carrying any other version is treated as a miss so an older process
//! never silently reads an incompatible newer format.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::singleflight::{RefreshOutcome, SingleFlight};
use super::users::{write_cache_file, UsersCache};
use crate::limiter::{call_with_retry, slack_retry_delay, RateLimiter};
use crate::models::channel::Channel;
use crate::slack::gateway::SlackGateway;
use crate::Result;

/// Schema version embedded in the cache file.
const CACHE_VERSION: u32 = 2;

/// Conversation kinds fetched into the directory.
const LIST_TYPES: &str = "public_channel,private_channel,mpim,im";

/// Page size for `conversations.list`.
const LIST_PAGE_SIZE: u16 = 999;

/// Cooldown between miss-triggered refreshes.
const REFRESH_COOLDOWN: Duration = Duration::from_secs(10);

/// On-disk snapshot format, v2.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct ChannelsCacheFile {
    version: u32,
    channels: HashMap<String, Channel>,
}

#[derive(Debug, Default)]
struct ChannelsIndex {
    channels: HashMap<String, Channel>,
    by_ref: HashMap<String, String>,
}

/// Channels directory with forward and inverse lookups.
#[derive(Debug)]
pub struct ChannelsCache {
    path: PathBuf,
    inner: RwLock<ChannelsIndex>,
    ready: AtomicBool,
    flight: Arc<SingleFlight>,
}

impl ChannelsCache {
    /// Create an empty cache that persists to `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            inner: RwLock::new(ChannelsIndex::default()),
            ready: AtomicBool::new(false),
            flight: Arc::new(SingleFlight::new(REFRESH_COOLDOWN)),
        }
    }

    /// Whether the directory has been populated (from disk or API).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Load the on-disk snapshot. A version mismatch is a miss.
    pub async fn load(&self, users: &UsersCache) -> bool {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            debug!(path = %self.path.display(), "no channels cache on disk");
            return false;
        };
        match serde_json::from_str::<ChannelsCacheFile>(&raw) {
            Ok(file) if file.version == CACHE_VERSION && !file.channels.is_empty() => {
                let count = file.channels.len();
                let index = build_index(file.channels, users).await;
                *self.inner.write().await = index;
                self.ready.store(true, Ordering::Release);
                info!(count, path = %self.path.display(), "channels cache loaded from disk");
                true
            }
            Ok(file) if file.version != CACHE_VERSION => {
                warn!(
                    found = file.version,
                    expected = CACHE_VERSION,
                    "channels cache version mismatch; ignoring"
                );
                false
            }
            Ok(_) => false,
            Err(err) => {
                warn!(%err, path = %self.path.display(), "channels cache unreadable; ignoring");
                false
            }
        }
    }

    /// Look up a channel by ID.
    pub async fn get(&self, id: &str) -> Option<Channel> {
        self.inner.read().await.channels.get(id).cloned()
    }

    /// Inverse lookup: `#name`, `@handle`, or group-DM label → channel ID.
    /// A bare `name` is also tried as `#name`.
    pub async fn resolve_ref(&self, reference: &str) -> Option<String> {
        let index = self.inner.read().await;
        if let Some(id) = index.by_ref.get(reference) {
            return Some(id.clone());
        }
        if !reference.starts_with('#') && !reference.starts_with('@') {
            if let Some(id) = index.by_ref.get(&format!("#{reference}")) {
                return Some(id.clone());
            }
        }
        None
    }

    /// All channels, sorted by display relevance (name, then ID).
    pub async fn all(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> =
            self.inner.read().await.channels.values().cloned().collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        channels
    }

    /// Display name for a channel ID, when cached.
    pub async fn display_name(&self, id: &str, users: &UsersCache) -> Option<String> {
        let channel = self.get(id).await?;
        let counterparty = channel.user.clone();
        let login = match counterparty {
            Some(user_id) => users.login(&user_id).await,
            None => None,
        };
        Some(channel.display_name(|_| login.clone()))
    }

    /// Rebuild the inverse index, resolving IM labels against a (newly
    /// refreshed) users directory.
    pub async fn reindex(&self, users: &UsersCache) {
        let channels = self.inner.read().await.channels.clone();
        let index = build_index(channels, users).await;
        *self.inner.write().await = index;
    }

    /// Refresh the directory from `conversations.list`, coalesced with any
    /// refresh already in flight.
    pub async fn refresh(
        self: &Arc<Self>,
        gateway: Arc<SlackGateway>,
        users: Arc<UsersCache>,
        limiter: Arc<RateLimiter>,
        ct: CancellationToken,
    ) -> RefreshOutcome {
        let this = Arc::clone(self);
        self.flight
            .run(move || async move {
                match this.fetch_and_swap(&gateway, &users, &limiter, &ct).await {
                    Ok(count) => {
                        info!(count, "channels cache refreshed");
                        RefreshOutcome::Refreshed
                    }
                    Err(err) if err.is_rate_limited() => {
                        warn!("channels refresh rate-limited");
                        RefreshOutcome::RateLimited
                    }
                    Err(err) => {
                        warn!(%err, "channels refresh failed");
                        RefreshOutcome::Failed(err.to_string())
                    }
                }
            })
            .await
    }

    async fn fetch_and_swap(
        &self,
        gateway: &SlackGateway,
        users: &UsersCache,
        limiter: &RateLimiter,
        ct: &CancellationToken,
    ) -> Result<usize> {
        let mut channels: HashMap<String, Channel> = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = call_with_retry(limiter, ct, 2, slack_retry_delay, || {
                gateway.conversations_list(LIST_TYPES, LIST_PAGE_SIZE, cursor.as_deref())
            })
            .await?;

            for wire in page.channels {
                let channel = wire.into_channel();
                channels.insert(channel.id.clone(), channel);
            }

            match page.response_metadata.cursor() {
                Some(next) => cursor = Some(next.to_owned()),
                None => break,
            }
        }

        let count = channels.len();
        let file = ChannelsCacheFile {
            version: CACHE_VERSION,
            channels: channels.clone(),
        };

        let index = build_index(channels, users).await;
        *self.inner.write().await = index;
        self.ready.store(true, Ordering::Release);

        if let Err(err) = write_cache_file(&self.path, &file) {
            warn!(%err, path = %self.path.display(), "failed to persist channels cache");
        }

        Ok(count)
    }
}

/// Build the inverse index under the display-name convention.
///
/// IMs whose counterparty is not yet in the users directory are indexed by
/// `@<user_id>` until a later refresh resolves the login. Collisions keep
/// the first entry and are logged.
async fn build_index(channels: HashMap<String, Channel>, users: &UsersCache) -> ChannelsIndex {
    let mut by_ref: HashMap<String, String> = HashMap::new();

    let mut ordered: Vec<&Channel> = channels.values().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    for channel in ordered {
        let key = if channel.is_im {
            let counterparty = channel.user.as_deref().unwrap_or(channel.id.as_str());
            let login = users.login(counterparty).await;
            format!("@{}", login.unwrap_or_else(|| counterparty.to_owned()))
        } else if channel.is_mpim {
            channel.name.clone()
        } else {
            format!("#{}", channel.name)
        };

        if key.len() <= 1 {
            continue;
        }
        if let Some(existing) = by_ref.get(&key) {
            if existing != &channel.id {
                warn!(
                    reference = %key,
                    kept = %existing,
                    dropped = %channel.id,
                    "duplicate channel reference in directory"
                );
            }
            continue;
        }
        by_ref.insert(key, channel.id.clone());
    }

    ChannelsIndex { channels, by_ref }
}
