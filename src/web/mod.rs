//! Web layer module
//!
//! HTTP and WebSocket surface of the status hub. Handlers stay thin: the
//! status endpoints call the aggregator, the socket endpoint registers with
//! the broadcast hub, and everything else is health reporting.

use anyhow::Result;
use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::{BroadcastHub, PollScheduler, SnapshotAggregator};

pub mod handlers;
pub mod openapi;
pub mod responses;

pub use responses::{HealthResponse, ok};

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr =
            format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        let app = Self::create_router(state);
        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            // Health check endpoints
            .route("/health", get(handlers::health::health_check))
            .route("/live", get(handlers::health::liveness_check))
            // OpenAPI documentation
            .route("/api/openapi.json", get(openapi::openapi_json))
            // Server status
            .route(
                "/api/server/status",
                get(handlers::server_status::get_server_status),
            )
            .route(
                "/api/server/stats",
                get(handlers::server_status::get_server_stats),
            )
            // Live updates
            .route("/ws", get(handlers::websocket::ws_handler))
            // Middleware (applied in reverse order)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serve with cancellation support and ready notification
    pub async fn serve_with_cancellation(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
        cancellation_token: Option<tokio_util::sync::CancellationToken>,
    ) -> Result<()> {
        match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => {
                // Signal that we're now actually listening on the port
                let _ = ready_signal.send(Ok(()));

                let shutdown_signal = async move {
                    match &cancellation_token {
                        Some(token) => {
                            token.cancelled().await;
                            tracing::info!(
                                "Web server received cancellation signal, shutting down gracefully"
                            );
                        }
                        None => wait_for_shutdown_signal().await,
                    }
                };

                axum::serve(listener, self.app)
                    .with_graceful_shutdown(shutdown_signal)
                    .await?;
                Ok(())
            }
            Err(bind_error) => {
                let bind_err_msg = format!("Failed to bind to {}: {}", self.addr, bind_error);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{}", bind_err_msg)));
                Err(anyhow::anyhow!("{}", bind_err_msg))
            }
        }
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Resolve on SIGTERM or SIGINT (Ctrl+C elsewhere).
///
/// Falls back to never resolving if the handlers cannot be installed.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!("Failed to install signal handlers: {}", e);
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            return std::future::pending().await;
        }
        tracing::info!("Received Ctrl+C, shutting down gracefully");
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aggregator: Arc<SnapshotAggregator>,
    pub hub: Arc<BroadcastHub>,
    pub scheduler: Arc<PollScheduler>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        aggregator: Arc<SnapshotAggregator>,
        hub: Arc<BroadcastHub>,
        scheduler: Arc<PollScheduler>,
    ) -> Self {
        Self {
            config,
            aggregator,
            hub,
            scheduler,
            started_at: Utc::now(),
        }
    }
}
