//! Shared fixtures: a fake FiveM server and a wired-up application
#![allow(dead_code)]

use axum::{
    Json, Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use fivem_status_hub::config::Config;
use fivem_status_hub::repositories::{InMemorySettingsRepository, SettingsRepository};
use fivem_status_hub::services::{
    BroadcastHub, FiveMStatusClient, PollScheduler, SnapshotAggregator, StatusCache,
};
use fivem_status_hub::web::{AppState, WebServer};

/// What one fake endpoint answers
#[derive(Clone)]
pub enum Body {
    Json(Value),
    /// Sent verbatim as `application/json`
    Raw(&'static str),
    /// 404
    Missing,
}

#[derive(Clone)]
pub struct Document {
    pub body: Body,
    pub delay: Duration,
}

impl Document {
    pub fn json(value: Value) -> Self {
        Self {
            body: Body::Json(value),
            delay: Duration::ZERO,
        }
    }
}

/// Documents served by [`spawn_fake_server`]
#[derive(Clone)]
pub struct FakeServer {
    pub info: Document,
    pub players: Document,
    pub dynamic: Document,
}

impl FakeServer {
    pub fn test_city(players: Value) -> Self {
        Self {
            info: Document::json(
                json!({ "vars": { "sv_hostname": "Test City", "sv_maxClients": 64 } }),
            ),
            players: Document::json(players),
            dynamic: Document::json(json!({ "resources": ["a", "b", "c"] })),
        }
    }

    /// Delay every document by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.info.delay = delay;
        self.players.delay = delay;
        self.dynamic.delay = delay;
        self
    }

    pub fn without_dynamic(mut self) -> Self {
        self.dynamic.body = Body::Missing;
        self
    }
}

async fn respond(document: Document) -> Response {
    tokio::time::sleep(document.delay).await;
    match document.body {
        Body::Json(value) => Json(value).into_response(),
        Body::Raw(text) => ([(header::CONTENT_TYPE, "application/json")], text).into_response(),
        Body::Missing => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve `server` on an ephemeral port, returning `host:port`
pub async fn spawn_fake_server(server: FakeServer) -> String {
    let FakeServer {
        info,
        players,
        dynamic,
    } = server;

    let app = Router::new()
        .route("/info.json", get(move || respond(info.clone())))
        .route("/players.json", get(move || respond(players.clone())))
        .route("/dynamic.json", get(move || respond(dynamic.clone())));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    address.to_string()
}

/// An address nothing listens on
pub async fn refused_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    address.to_string()
}

/// Configuration pointing at `address` with a short request timeout
pub fn config_for(address: &str) -> Config {
    let (host, port) = address.rsplit_once(':').unwrap();
    let mut config = Config::default();
    config.game_server.host = host.to_string();
    config.game_server.port = port.parse().unwrap();
    config.game_server.request_timeout = Duration::from_millis(500);
    config.broadcast.heartbeat_interval = Duration::from_secs(30);
    config
}

pub struct TestApp {
    pub state: AppState,
    pub settings: Arc<InMemorySettingsRepository>,
}

/// Wire the application the way `main` does, with in-memory settings
pub fn build_app(config: Config) -> TestApp {
    let config = Arc::new(config);
    let settings = Arc::new(InMemorySettingsRepository::new());
    let client =
        FiveMStatusClient::from_config(&config.game_server, &config.classification).unwrap();

    let aggregator = Arc::new(SnapshotAggregator::new(
        Arc::new(client),
        Arc::new(StatusCache::new()),
        settings.clone() as Arc<dyn SettingsRepository>,
        &config.game_server,
    ));
    let hub = Arc::new(BroadcastHub::new(
        aggregator.clone(),
        config.broadcast.heartbeat_interval,
    ));
    let scheduler = Arc::new(PollScheduler::new(
        aggregator.clone(),
        hub.clone(),
        config.game_server.poll_interval,
    ));

    TestApp {
        state: AppState::new(config, aggregator, hub, scheduler),
        settings,
    }
}

pub fn router(app: &TestApp) -> Router {
    WebServer::create_router(app.state.clone())
}
