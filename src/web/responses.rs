//! HTTP response types and utilities

use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: i64,
    /// Open WebSocket subscriptions
    pub subscribers: usize,
    /// `running` or `stopped`
    pub scheduler: String,
    pub cache: CacheHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheHealth {
    pub populated: bool,
    /// When the last live snapshot was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_live_at: Option<DateTime<Utc>>,
}

impl HealthResponse {
    pub fn healthy(started_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: now,
            uptime_seconds: (now - started_at).num_seconds().max(0),
            subscribers: 0,
            scheduler: String::new(),
            cache: CacheHealth {
                populated: false,
                last_live_at: None,
            },
        }
    }
}

/// Plain 200 with a JSON body
pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(data))
}
