//! Server status HTTP handlers
//!
//! Both routes resolve a fresh snapshot and always answer 200; a degraded
//! or unavailable upstream is reported in the body, never as a fault.

use axum::{Json, extract::State};

use crate::models::StatusPayload;
use crate::web::AppState;

/// Current game server status
#[utoipa::path(
    get,
    path = "/api/server/status",
    tag = "server",
    summary = "Game server status",
    description = "Live status when the game server answers, otherwise the last known status or placeholder values",
    responses(
        (status = 200, description = "Resolved server status", body = StatusPayload)
    )
)]
pub async fn get_server_status(State(state): State<AppState>) -> Json<StatusPayload> {
    let snapshot = state.aggregator.resolve_status().await;
    Json(StatusPayload::from(&snapshot))
}

/// Alias of `/api/server/status`
#[utoipa::path(
    get,
    path = "/api/server/stats",
    tag = "server",
    summary = "Game server statistics",
    responses(
        (status = 200, description = "Resolved server status", body = StatusPayload)
    )
)]
pub async fn get_server_stats(state: State<AppState>) -> Json<StatusPayload> {
    get_server_status(state).await
}
