//! Single-slot store for the most recent live snapshot

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::StatusSnapshot;

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Arc<StatusSnapshot>,
    stored_at: DateTime<Utc>,
}

/// Holds the last snapshot fetched from the game server.
///
/// Entries never expire. Each write swaps the
/// whole entry, so readers see either the old or the new snapshot.
#[derive(Debug, Default)]
pub struct StatusCache {
    slot: RwLock<Option<CacheEntry>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached snapshot. Only `Live` snapshots are accepted.
    pub async fn put(&self, snapshot: &StatusSnapshot) {
        if !snapshot.is_live() {
            warn!(
                "Refusing to cache a {} snapshot; only live results are stored",
                snapshot.origin
            );
            return;
        }

        let entry = CacheEntry {
            snapshot: Arc::new(snapshot.clone()),
            stored_at: Utc::now(),
        };
        *self.slot.write().await = Some(entry);
        debug!(
            players = snapshot.players,
            "Cached live status for {}", snapshot.server_name
        );
    }

    /// The last live snapshot re-tagged as `Cached`, if one was ever stored
    pub async fn get_last_live(&self) -> Option<StatusSnapshot> {
        let entry = self.slot.read().await.clone()?;
        Some(entry.snapshot.as_cached())
    }

    pub async fn last_stored_at(&self) -> Option<DateTime<Utc>> {
        self.slot.read().await.as_ref().map(|entry| entry.stored_at)
    }

    pub async fn is_empty(&self) -> bool {
        self.slot.read().await.is_none()
    }
}
