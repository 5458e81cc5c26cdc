//! HTTP surface: status routes, health and the OpenAPI document

mod common;

use axum_test::TestServer;
use serde_json::{Value, json};

use common::{FakeServer, build_app, config_for, refused_address, router, spawn_fake_server};
use fivem_status_hub::models::{PayloadStatus, SnapshotOrigin, StatusPayload, StatusSnapshot};

#[tokio::test]
async fn status_route_reports_live_server() {
    let address = spawn_fake_server(FakeServer::test_city(json!([
        { "name": "COPE Tanaka" },
        { "name": "Civilian" }
    ])))
    .await;
    let app = build_app(config_for(&address));
    let server = TestServer::new(router(&app)).unwrap();

    let response = server.get("/api/server/status").await;
    response.assert_status_ok();

    let payload: StatusPayload = response.json();
    assert_eq!(payload.status, PayloadStatus::Success);
    assert!(payload.online);
    assert_eq!(payload.players, 2);
    assert_eq!(payload.max_players, 64);
    assert_eq!(payload.server_name, "Test City");
    assert_eq!(payload.resources, Some(3));
    assert_eq!(payload.player_stats.police, 1);
    assert_eq!(payload.origin, SnapshotOrigin::Live);
    assert_eq!(payload.cached, None);
    assert_eq!(payload.error, None);
}

#[tokio::test]
async fn stats_route_answers_like_status_route() {
    let address = spawn_fake_server(FakeServer::test_city(json!([{ "name": "Alice" }]))).await;
    let app = build_app(config_for(&address));
    let server = TestServer::new(router(&app)).unwrap();

    let status: StatusPayload = server.get("/api/server/status").await.json();
    let stats: StatusPayload = server.get("/api/server/stats").await.json();

    assert_eq!(stats.status, status.status);
    assert_eq!(stats.players, status.players);
    assert_eq!(stats.server_name, status.server_name);
}

#[tokio::test]
async fn unreachable_server_is_still_200_with_placeholder() {
    let address = refused_address().await;
    let app = build_app(config_for(&address));
    let server = TestServer::new(router(&app)).unwrap();

    let response = server.get("/api/server/status").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["online"], false);
    assert_eq!(body["players"], 0);
    assert_eq!(body["maxPlayers"], 128);
    assert_eq!(body["serverName"], "Tokyo Edge Roleplay");
    assert_eq!(body["origin"], "default");
    assert_eq!(body["cached"], false);
}

#[tokio::test]
async fn unreachable_server_serves_last_known_status() {
    let address = refused_address().await;
    let app = build_app(config_for(&address));
    app.state
        .aggregator
        .cache()
        .put(&StatusSnapshot {
            online: true,
            players: 10,
            origin: SnapshotOrigin::Live,
            ..StatusSnapshot::fallback("Test City", 64)
        })
        .await;
    let server = TestServer::new(router(&app)).unwrap();

    let response = server.get("/api/server/stats").await;
    response.assert_status_ok();

    let payload: StatusPayload = response.json();
    assert_eq!(payload.status, PayloadStatus::Degraded);
    assert_eq!(payload.players, 10);
    assert_eq!(payload.origin, SnapshotOrigin::Cached);
    assert_eq!(payload.cached, Some(true));
    assert!(payload.error.is_some());
}

#[tokio::test]
async fn health_reports_service_state() {
    let address = refused_address().await;
    let app = build_app(config_for(&address));
    let server = TestServer::new(router(&app)).unwrap();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["subscribers"], 0);
    assert_eq!(body["scheduler"], "stopped");
    assert_eq!(body["cache"]["populated"], false);

    server.get("/live").await.assert_status_ok();
}

#[tokio::test]
async fn openapi_document_lists_status_routes() {
    let address = refused_address().await;
    let app = build_app(config_for(&address));
    let server = TestServer::new(router(&app)).unwrap();

    let body: Value = server.get("/api/openapi.json").await.json();
    assert!(body["paths"]["/api/server/status"].is_object());
    assert!(body["paths"]["/api/server/stats"].is_object());
}
