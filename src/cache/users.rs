//! Users directory cache: id → user plus the inverse handle index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::singleflight::{RefreshOutcome, SingleFlight};
use crate::limiter::{call_with_retry, slack_retry_delay, RateLimiter};
use crate::models::user::User;
use crate::slack::gateway::SlackGateway;
use crate::{AppError, Result};

/// Cooldown between miss-triggered refreshes.
const REFRESH_COOLDOWN: Duration = Duration::from_secs(10);

/// On-disk snapshot format (unversioned).
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct UsersCacheFile {
    users: HashMap<String, User>,
}

#[derive(Debug, Default)]
struct UsersIndex {
    users: HashMap<String, User>,
    by_name: HashMap<String, String>,
}

impl UsersIndex {
    fn build(users: HashMap<String, User>) -> Self {
        let mut by_name: HashMap<String, String> = HashMap::new();
        for user in users.values() {
            if user.name.is_empty() {
                continue;
            }
            if let Some(existing) = by_name.get(&user.name) {
                if existing != &user.id {
                    // First seen wins; duplicates are logged, never
                    // silently overwritten.
                    warn!(
                        handle = %user.name,
                        kept = %existing,
                        dropped = %user.id,
                        "duplicate user handle in directory"
                    );
                }
                continue;
            }
            by_name.insert(user.name.clone(), user.id.clone());
        }
        Self { users, by_name }
    }
}

/// Users directory with forward and inverse lookups.
#[derive(Debug)]
pub struct UsersCache {
    path: PathBuf,
    inner: RwLock<UsersIndex>,
    ready: AtomicBool,
    flight: Arc<SingleFlight>,
}

impl UsersCache {
    /// Create an empty cache that persists to `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            inner: RwLock::new(UsersIndex::default()),
            ready: AtomicBool::new(false),
            flight: Arc::new(SingleFlight::new(REFRESH_COOLDOWN)),
        }
    }

    /// Whether the directory has been populated (from disk or API).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Load the on-disk snapshot, if one exists. A missing or unreadable
    /// file is a miss, not an error; the API backfill will rebuild it.
    pub async fn load(&self) -> bool {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            debug!(path = %self.path.display(), "no users cache on disk");
            return false;
        };
        match serde_json::from_str::<UsersCacheFile>(&raw) {
            Ok(file) if !file.users.is_empty() => {
                let count = file.users.len();
                *self.inner.write().await = UsersIndex::build(file.users);
                self.ready.store(true, Ordering::Release);
                info!(count, path = %self.path.display(), "users cache loaded from disk");
                true
            }
            Ok(_) => false,
            Err(err) => {
                warn!(%err, path = %self.path.display(), "users cache unreadable; ignoring");
                false
            }
        }
    }

    /// Look up a user by ID.
    pub async fn get(&self, id: &str) -> Option<User> {
        self.inner.read().await.users.get(id).cloned()
    }

    /// Inverse lookup: login handle → user ID.
    pub async fn id_for_handle(&self, handle: &str) -> Option<String> {
        self.inner.read().await.by_name.get(handle).cloned()
    }

    /// Login handle for a user ID, used for `@name` IM labels.
    pub async fn login(&self, id: &str) -> Option<String> {
        self.inner
            .read()
            .await
            .users
            .get(id)
            .map(|u| u.name.clone())
    }

    /// All users, sorted by ID for stable output.
    pub async fn all(&self) -> Vec<User> {
        let mut users: Vec<User> = self.inner.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    /// Refresh the directory from `users.list`, coalesced with any refresh
    /// already in flight. The winner's fetch runs detached so a cancelled
    /// trigger still benefits later callers.
    pub async fn refresh(
        self: &Arc<Self>,
        gateway: Arc<SlackGateway>,
        limiter: Arc<RateLimiter>,
        ct: CancellationToken,
    ) -> RefreshOutcome {
        let this = Arc::clone(self);
        self.flight
            .run(move || async move {
                match this.fetch_and_swap(&gateway, &limiter, &ct).await {
                    Ok(count) => {
                        info!(count, "users cache refreshed");
                        RefreshOutcome::Refreshed
                    }
                    Err(err) if err.is_rate_limited() => {
                        warn!("users refresh rate-limited");
                        RefreshOutcome::RateLimited
                    }
                    Err(err) => {
                        warn!(%err, "users refresh failed");
                        RefreshOutcome::Failed(err.to_string())
                    }
                }
            })
            .await
    }

    async fn fetch_and_swap(
        &self,
        gateway: &SlackGateway,
        limiter: &RateLimiter,
        ct: &CancellationToken,
    ) -> Result<usize> {
        let mut users: HashMap<String, User> = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = call_with_retry(limiter, ct, 2, slack_retry_delay, || {
                gateway.users_list(cursor.as_deref())
            })
            .await?;

            for wire in page.members {
                let user = wire.into_user();
                users.insert(user.id.clone(), user);
            }

            match page.response_metadata.cursor() {
                Some(next) => cursor = Some(next.to_owned()),
                None => break,
            }
        }

        let count = users.len();
        let file = UsersCacheFile {
            users: users.clone(),
        };

        *self.inner.write().await = UsersIndex::build(users);
        self.ready.store(true, Ordering::Release);

        if let Err(err) = write_cache_file(&self.path, &file) {
            warn!(%err, path = %self.path.display(), "failed to persist users cache");
        }

        Ok(count)
    }
}

/// Write a JSON snapshot via temp-file + rename so a half-written file is
/// never observed.
pub(crate) fn write_cache_file<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| AppError::Io(format!("cache path '{}' has no parent", path.display())))?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    serde_json::to_writer(&mut tmp, value)?;
    tmp.persist(path)
        .map_err(|err| AppError::Io(format!("persist cache: {err}")))?;
    Ok(())
}
