//! Health check HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::web::{
    AppState,
    responses::{CacheHealth, HealthResponse, ok},
};

/// Health check endpoint
///
/// Always healthy while the process serves requests; the body reports the
/// state of the polling loop, the cache and the subscriber set.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Service health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.aggregator.cache();

    let mut response = HealthResponse::healthy(state.started_at);
    response.subscribers = state.hub.subscriber_count().await;
    response.scheduler = state.scheduler.state().await.to_string();
    response.cache = CacheHealth {
        populated: !cache.is_empty().await,
        last_live_at: cache.last_stored_at().await,
    };

    ok(response)
}

/// Liveness check
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
