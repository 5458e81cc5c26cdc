//! FiveM HTTP query client
//!
//! A status fetch reads three documents from `http://{address}/`:
//! `info.json` and `players.json` are required, `dynamic.json` only
//! contributes the resource count. One deadline covers all three.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ClassificationConfig, GameServerConfig};
use crate::errors::{FetchError, FetchResult};
use crate::models::upstream::{
    PlayerEntry, ServerInfo, players_from_document, resource_count_from_document,
};
use crate::models::{PlayerBreakdown, SnapshotOrigin, StatusSnapshot};

const INFO_DOCUMENT: &str = "info.json";
const PLAYERS_DOCUMENT: &str = "players.json";
const DYNAMIC_DOCUMENT: &str = "dynamic.json";

/// Source of live server status
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch and normalize the server's current status.
    ///
    /// `timeout` bounds the entire call; on success the snapshot is tagged `Live`.
    async fn fetch_live(&self, address: &str, timeout: Duration) -> FetchResult<StatusSnapshot>;
}

/// Counts players per faction from their display names
#[derive(Debug, Clone)]
pub struct PlayerClassifier {
    police_marker: String,
    medic_marker: String,
    staff_prefix: String,
}

impl PlayerClassifier {
    pub fn new<P: Into<String>, M: Into<String>, S: Into<String>>(
        police_marker: P,
        medic_marker: M,
        staff_prefix: S,
    ) -> Self {
        Self {
            police_marker: police_marker.into(),
            medic_marker: medic_marker.into(),
            staff_prefix: staff_prefix.into(),
        }
    }

    /// Categories are independent: one player may count as both staff and police.
    pub fn classify(&self, players: &[PlayerEntry]) -> PlayerBreakdown {
        let mut breakdown = PlayerBreakdown {
            total: u32::try_from(players.len()).unwrap_or(u32::MAX),
            ..PlayerBreakdown::default()
        };

        for name in players.iter().filter_map(|p| p.name.as_deref()) {
            if !self.police_marker.is_empty() && name.contains(self.police_marker.as_str()) {
                breakdown.police += 1;
            }
            if !self.medic_marker.is_empty() && name.contains(self.medic_marker.as_str()) {
                breakdown.medic += 1;
            }
            if !self.staff_prefix.is_empty() && name.starts_with(self.staff_prefix.as_str()) {
                breakdown.staff += 1;
            }
        }

        breakdown
    }
}

impl Default for PlayerClassifier {
    fn default() -> Self {
        Self::from(&ClassificationConfig::default())
    }
}

impl From<&ClassificationConfig> for PlayerClassifier {
    fn from(config: &ClassificationConfig) -> Self {
        Self::new(
            config.police_marker.clone(),
            config.medic_marker.clone(),
            config.staff_prefix.clone(),
        )
    }
}

/// The three query URLs for one server
#[derive(Debug, Clone)]
struct UpstreamEndpoints {
    info: Url,
    players: Url,
    dynamic: Url,
}

impl UpstreamEndpoints {
    fn for_address(address: &str) -> FetchResult<Self> {
        let base_str = format!("http://{}/", address.trim());
        let base = Url::parse(&base_str)
            .map_err(|e| FetchError::unreachable(&base_str, format!("invalid address: {e}")))?;
        let join = |document: &str| {
            base.join(document)
                .map_err(|e| FetchError::unreachable(&base_str, format!("invalid address: {e}")))
        };

        Ok(Self {
            info: join(INFO_DOCUMENT)?,
            players: join(PLAYERS_DOCUMENT)?,
            dynamic: join(DYNAMIC_DOCUMENT)?,
        })
    }
}

/// `StatusSource` backed by the FiveM server's HTTP endpoints
pub struct FiveMStatusClient {
    client: Client,
    classifier: PlayerClassifier,
    fallback_server_name: String,
    fallback_max_players: u32,
}

impl FiveMStatusClient {
    pub fn new(
        client: Client,
        classifier: PlayerClassifier,
        fallback_server_name: String,
        fallback_max_players: u32,
    ) -> Self {
        Self {
            client,
            classifier,
            fallback_server_name,
            fallback_max_players,
        }
    }

    /// Build a client with its own connection pool from configuration
    pub fn from_config(
        game_server: &GameServerConfig,
        classification: &ClassificationConfig,
    ) -> FetchResult<Self> {
        let client = Client::builder()
            .connect_timeout(game_server.request_timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| FetchError::unreachable(game_server.address(), e.to_string()))?;

        Ok(Self::new(
            client,
            PlayerClassifier::from(classification),
            game_server.fallback_server_name.clone(),
            game_server.fallback_max_players,
        ))
    }

    /// GET `url` and decode its body as JSON
    async fn fetch_document(&self, url: &Url) -> FetchResult<Value> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::unreachable(url.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::unreachable(
                url.as_str(),
                format!("HTTP {status}"),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::unreachable(url.as_str(), e.to_string()))?;

        serde_json::from_slice(&body)
            .map_err(|e| FetchError::malformed(url.as_str(), format!("invalid JSON: {e}")))
    }

    /// info.json then players.json; returns the parsed info, players and info round-trip
    async fn fetch_required(
        &self,
        endpoints: &UpstreamEndpoints,
    ) -> FetchResult<(ServerInfo, Vec<PlayerEntry>, Duration)> {
        let started = Instant::now();
        let info_document = self.fetch_document(&endpoints.info).await?;
        let round_trip = started.elapsed();

        let info = ServerInfo::from_document(&info_document).ok_or_else(|| {
            FetchError::malformed(endpoints.info.as_str(), "expected a JSON object")
        })?;

        let players = players_from_document(self.fetch_document(&endpoints.players).await?);

        Ok((info, players, round_trip))
    }

    /// Resource count from dynamic.json; any failure yields `None`
    async fn fetch_resource_count(&self, endpoints: &UpstreamEndpoints) -> Option<u32> {
        match self.fetch_document(&endpoints.dynamic).await {
            Ok(document) => resource_count_from_document(&document),
            Err(e) => {
                debug!("Skipping resource count: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl StatusSource for FiveMStatusClient {
    async fn fetch_live(&self, address: &str, timeout: Duration) -> FetchResult<StatusSnapshot> {
        let endpoints = UpstreamEndpoints::for_address(address)?;
        let deadline = Instant::now() + timeout;

        // Dropping the timed-out future aborts the in-flight request.
        let (info, players, round_trip) =
            match tokio::time::timeout_at(deadline, self.fetch_required(&endpoints)).await {
                Ok(Ok(required)) => required,
                Ok(Err(e)) => {
                    warn!(kind = e.kind(), "Status fetch from {} failed: {}", address, e);
                    return Err(e);
                }
                Err(_) => {
                    warn!(
                        kind = "timeout",
                        "Status fetch from {} exceeded {:?}", address, timeout
                    );
                    return Err(FetchError::Timeout {
                        address: address.to_string(),
                        timeout,
                    });
                }
            };

        let resource_count =
            match tokio::time::timeout_at(deadline, self.fetch_resource_count(&endpoints)).await {
                Ok(count) => count,
                Err(_) => {
                    debug!("dynamic.json from {} did not finish before the deadline", address);
                    None
                }
            };

        let player_breakdown = self.classifier.classify(&players);

        Ok(StatusSnapshot {
            online: true,
            players: player_breakdown.total,
            max_players: info.max_clients.unwrap_or(self.fallback_max_players),
            server_name: info
                .hostname
                .unwrap_or_else(|| self.fallback_server_name.clone()),
            ping_ms: Some(u32::try_from(round_trip.as_millis()).unwrap_or(u32::MAX)),
            resource_count,
            player_breakdown,
            captured_at: Utc::now(),
            origin: SnapshotOrigin::Live,
        })
    }
}
