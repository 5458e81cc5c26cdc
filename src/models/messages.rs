//! WebSocket message envelopes

use serde::{Deserialize, Serialize};

use super::snapshot::StatusSnapshot;
use super::status_payload::StatusPayload;

/// Messages pushed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ServerStats(StatusPayload),
}

/// Messages accepted from subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    GetServerStats,
}

impl ServerMessage {
    pub fn server_stats(snapshot: &StatusSnapshot) -> Self {
        Self::ServerStats(StatusPayload::from(snapshot))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientMessage {
    /// `None` for anything that is not a known request.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SnapshotOrigin, StatusSnapshot};

    #[test]
    fn server_stats_is_tagged_and_flat() {
        let snapshot = StatusSnapshot::fallback("Test City", 64);
        let json: serde_json::Value =
            serde_json::from_str(&ServerMessage::server_stats(&snapshot).to_json().unwrap())
                .unwrap();

        assert_eq!(json["type"], "server_stats");
        assert_eq!(json["serverName"], "Test City");
        assert_eq!(json["origin"], "default");
    }

    #[test]
    fn server_stats_can_be_read_back_by_clients() {
        let snapshot = StatusSnapshot {
            origin: SnapshotOrigin::Cached,
            ..StatusSnapshot::fallback("Test City", 64)
        };
        let text = ServerMessage::server_stats(&snapshot).to_json().unwrap();
        let ServerMessage::ServerStats(payload) = serde_json::from_str(&text).unwrap();
        assert_eq!(payload.cached, Some(true));
        assert_eq!(payload.max_players, 64);
    }

    #[test]
    fn parses_stats_request() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"get_server_stats"}"#),
            Some(ClientMessage::GetServerStats)
        );
    }

    #[test]
    fn ignores_unknown_requests() {
        assert_eq!(ClientMessage::parse(r#"{"type":"subscribe_news"}"#), None);
        assert_eq!(ClientMessage::parse("ping"), None);
        assert_eq!(ClientMessage::parse(r#"{"kind":"get_server_stats"}"#), None);
    }
}
