//! OpenAPI document for the HTTP surface

use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FiveM Status Hub API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Game server status for the community site. Live updates are pushed over the `/ws` WebSocket as `server_stats` messages carrying the same payload as `/api/server/status`."
    ),
    paths(
        crate::web::handlers::server_status::get_server_status,
        crate::web::handlers::server_status::get_server_stats,
        crate::web::handlers::health::health_check,
    ),
    tags(
        (name = "server", description = "Game server status"),
        (name = "health", description = "Service health monitoring"),
    ),
    components(
        schemas(
            crate::models::StatusPayload,
            crate::models::PayloadStatus,
            crate::models::PlayerBreakdown,
            crate::models::SnapshotOrigin,
            crate::web::responses::HealthResponse,
            crate::web::responses::CacheHealth,
        )
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
