//! Live → Cached → Default status resolution

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::GameServerConfig;
use crate::models::setting::{SERVER_CATEGORY, keys};
use crate::models::{StatusSnapshot, UpsertSettingRequest};
use crate::repositories::SettingsRepository;
use crate::services::status_cache::StatusCache;
use crate::services::upstream_client::StatusSource;

/// Configured server address and fetch bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub address: String,
    pub timeout: Duration,
}

impl From<&GameServerConfig> for UpstreamTarget {
    fn from(config: &GameServerConfig) -> Self {
        Self {
            address: config.address(),
            timeout: config.request_timeout,
        }
    }
}

/// Produces the best available status snapshot; never fails
pub struct SnapshotAggregator {
    source: Arc<dyn StatusSource>,
    cache: Arc<StatusCache>,
    settings: Arc<dyn SettingsRepository>,
    target: UpstreamTarget,
    fallback_server_name: String,
    fallback_max_players: u32,
}

impl SnapshotAggregator {
    pub fn new(
        source: Arc<dyn StatusSource>,
        cache: Arc<StatusCache>,
        settings: Arc<dyn SettingsRepository>,
        game_server: &GameServerConfig,
    ) -> Self {
        Self {
            source,
            cache,
            settings,
            target: UpstreamTarget::from(game_server),
            fallback_server_name: game_server.fallback_server_name.clone(),
            fallback_max_players: game_server.fallback_max_players,
        }
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    /// Resolve against the configured server
    pub async fn resolve_status(&self) -> StatusSnapshot {
        self.resolve_status_for(&self.target.address, self.target.timeout)
            .await
    }

    /// Resolve against `address`, bounded by `timeout`
    pub async fn resolve_status_for(&self, address: &str, timeout: Duration) -> StatusSnapshot {
        match self.source.fetch_live(address, timeout).await {
            Ok(snapshot) => {
                self.cache.put(&snapshot).await;
                self.persist(&snapshot).await;
                snapshot
            }
            Err(e) => {
                if let Some(cached) = self.cache.get_last_live().await {
                    debug!(
                        kind = e.kind(),
                        "Serving cached status captured at {}", cached.captured_at
                    );
                    return cached;
                }
                debug!(kind = e.kind(), "No cached status, serving offline placeholder");
                self.default_snapshot().await
            }
        }
    }

    /// Seed the cache from the persisted live snapshot. Returns whether one was loaded.
    pub async fn restore_from_settings(&self) -> bool {
        if !self.cache.is_empty().await {
            return false;
        }

        let setting = match self.settings.get_setting(keys::LAST_SERVER_STATUS).await {
            Ok(Some(setting)) => setting,
            Ok(None) => return false,
            Err(e) => {
                warn!("Failed to load persisted server status: {}", e);
                return false;
            }
        };

        match serde_json::from_str::<StatusSnapshot>(&setting.value) {
            Ok(snapshot) if snapshot.is_live() => {
                info!(
                    "Restored last known status of {} captured at {}",
                    snapshot.server_name, snapshot.captured_at
                );
                self.cache.put(&snapshot).await;
                true
            }
            Ok(snapshot) => {
                warn!(
                    "Ignoring persisted server status with origin {}",
                    snapshot.origin
                );
                false
            }
            Err(e) => {
                warn!("Persisted server status is unreadable: {}", e);
                false
            }
        }
    }

    async fn persist(&self, snapshot: &StatusSnapshot) {
        let value = match serde_json::to_string(snapshot) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode server status for persistence: {}", e);
                return;
            }
        };

        let request = UpsertSettingRequest::new(keys::LAST_SERVER_STATUS, value, SERVER_CATEGORY);
        if let Err(e) = self.settings.upsert_setting(request).await {
            warn!("Failed to persist server status: {}", e);
        }
    }

    /// Offline placeholder, honouring admin overrides for name and slot count
    async fn default_snapshot(&self) -> StatusSnapshot {
        let server_name = self
            .setting_value(keys::SERVER_NAME)
            .await
            .unwrap_or_else(|| self.fallback_server_name.clone());

        let max_players = self
            .setting_value(keys::SERVER_MAX_PLAYERS)
            .await
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(self.fallback_max_players);

        StatusSnapshot::fallback(server_name, max_players)
    }

    async fn setting_value(&self, key: &str) -> Option<String> {
        match self.settings.get_setting(key).await {
            Ok(setting) => setting
                .map(|s| s.value.trim().to_string())
                .filter(|value| !value.is_empty()),
            Err(e) => {
                warn!("Failed to read setting '{}': {}", key, e);
                None
            }
        }
    }
}
