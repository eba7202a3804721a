//! Workspace cache: users and channels directories, readiness gating,
//! single-flight refresh, and the channel-reference resolver.

pub mod channels;
pub mod ready;
pub mod resolver;
pub mod singleflight;
pub mod users;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::limiter::Limiters;
use crate::slack::gateway::SlackGateway;

use channels::ChannelsCache;
use ready::ReadyState;
use singleflight::RefreshOutcome;
use users::UsersCache;

/// The two directory caches bundled with their refresh plumbing.
#[derive(Debug, Clone)]
pub struct WorkspaceCache {
    /// Users directory.
    pub users: Arc<UsersCache>,
    /// Channels directory.
    pub channels: Arc<ChannelsCache>,
}

impl WorkspaceCache {
    /// Create empty caches persisting to the configured paths.
    #[must_use]
    pub fn new(config: &crate::config::Config) -> Self {
        Self {
            users: Arc::new(UsersCache::new(config.users_cache_path.clone())),
            channels: Arc::new(ChannelsCache::new(config.channels_cache_path.clone())),
        }
    }

    /// Aggregate readiness of both gates.
    #[must_use]
    pub fn readiness(&self) -> ReadyState {
        ReadyState::from_gates(self.users.is_ready(), self.channels.is_ready())
    }

    /// Load both caches from disk, then backfill from the API on a
    /// background task. Requests are served while the sync is in flight;
    /// readiness gates open as each directory lands.
    pub fn spawn_backfill(
        &self,
        gateway: Arc<SlackGateway>,
        limiters: Limiters,
        ct: CancellationToken,
    ) {
        let users = Arc::clone(&self.users);
        let channels = Arc::clone(&self.channels);

        tokio::spawn(async move {
            users.load().await;
            channels.load(&users).await;

            // Users first so IM labels resolve during the channels pass.
            let outcome = users
                .refresh(
                    Arc::clone(&gateway),
                    Arc::clone(&limiters.tier2),
                    ct.clone(),
                )
                .await;
            info!(?outcome, "startup users backfill finished");

            let outcome = channels
                .refresh(
                    Arc::clone(&gateway),
                    Arc::clone(&users),
                    Arc::clone(&limiters.tier2),
                    ct.clone(),
                )
                .await;
            info!(?outcome, "startup channels backfill finished");

            channels.reindex(&users).await;
        });
    }

    /// Force a channels refresh, coalescing with any already in flight.
    pub async fn force_refresh_channels(
        &self,
        gateway: Arc<SlackGateway>,
        limiters: &Limiters,
        ct: CancellationToken,
    ) -> RefreshOutcome {
        self.channels
            .refresh(
                gateway,
                Arc::clone(&self.users),
                Arc::clone(&limiters.tier2),
                ct,
            )
            .await
    }
}
