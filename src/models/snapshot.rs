//! Normalized view of the game server at one point in time

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which resolution tier produced a snapshot
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SnapshotOrigin {
    /// Fetched from the game server during this resolution
    Live,
    /// Replica of the most recent live snapshot
    Cached,
    /// Synthesized when nothing better was available
    Default,
}

/// Player counts by faction; the categories may overlap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlayerBreakdown {
    pub total: u32,
    pub police: u32,
    pub medic: u32,
    pub staff: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub online: bool,
    /// Connected players as reported upstream; not clamped to `max_players`
    pub players: u32,
    pub max_players: u32,
    pub server_name: String,
    pub ping_ms: Option<u32>,
    pub resource_count: Option<u32>,
    pub player_breakdown: PlayerBreakdown,
    pub captured_at: DateTime<Utc>,
    pub origin: SnapshotOrigin,
}

impl StatusSnapshot {
    /// The offline placeholder served when neither the server nor the cache can answer.
    pub fn fallback<S: Into<String>>(server_name: S, max_players: u32) -> Self {
        Self {
            online: false,
            players: 0,
            max_players,
            server_name: server_name.into(),
            ping_ms: None,
            resource_count: None,
            player_breakdown: PlayerBreakdown::default(),
            captured_at: Utc::now(),
            origin: SnapshotOrigin::Default,
        }
    }

    /// Copy of this snapshot tagged as served from cache.
    pub fn as_cached(&self) -> Self {
        Self {
            origin: SnapshotOrigin::Cached,
            ..self.clone()
        }
    }

    pub fn is_live(&self) -> bool {
        self.origin == SnapshotOrigin::Live
    }
}
