//! Client-facing presentation of a snapshot, shared by HTTP and WebSocket

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::snapshot::{PlayerBreakdown, SnapshotOrigin, StatusSnapshot};

pub const CACHED_STATUS_ERROR: &str = "server unreachable, showing last known status";
pub const UNAVAILABLE_STATUS_ERROR: &str = "server unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PayloadStatus {
    /// Fresh data from the game server
    Success,
    /// Last known data; the game server did not answer
    Degraded,
    /// No data at all; placeholder values
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub status: PayloadStatus,
    pub online: bool,
    pub players: u32,
    pub max_players: u32,
    pub server_name: String,
    /// Round-trip time of the last upstream query, in milliseconds
    pub ping: Option<u32>,
    pub resources: Option<u32>,
    pub player_stats: PlayerBreakdown,
    pub last_update: DateTime<Utc>,
    pub origin: SnapshotOrigin,
    /// Present only on degraded responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    /// Present only on degraded responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&StatusSnapshot> for StatusPayload {
    fn from(snapshot: &StatusSnapshot) -> Self {
        let (status, cached, error) = match snapshot.origin {
            SnapshotOrigin::Live => (PayloadStatus::Success, None, None),
            SnapshotOrigin::Cached => (
                PayloadStatus::Degraded,
                Some(true),
                Some(CACHED_STATUS_ERROR.to_string()),
            ),
            SnapshotOrigin::Default => (
                PayloadStatus::Unavailable,
                Some(false),
                Some(UNAVAILABLE_STATUS_ERROR.to_string()),
            ),
        };

        Self {
            status,
            online: snapshot.online,
            players: snapshot.players,
            max_players: snapshot.max_players,
            server_name: snapshot.server_name.clone(),
            ping: snapshot.ping_ms,
            resources: snapshot.resource_count,
            player_stats: snapshot.player_breakdown,
            last_update: snapshot.captured_at,
            origin: snapshot.origin,
            cached,
            error,
        }
    }
}
