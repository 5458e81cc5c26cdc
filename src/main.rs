use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fivem_status_hub::{
    config::{Config, DatabaseConfig},
    database::Database,
    repositories::{InMemorySettingsRepository, SettingsRepository},
    services::{BroadcastHub, FiveMStatusClient, PollScheduler, SnapshotAggregator, StatusCache},
    web::{AppState, WebServer, wait_for_shutdown_signal},
};

#[derive(Parser)]
#[command(name = "fivem-status-hub")]
#[command(version)]
#[command(about = "Live FiveM server status with WebSocket fan-out")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (default: $CONFIG_FILE, then config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("fivem_status_hub={},tower_http=trace", cli.log_level)
    } else {
        format!("fivem_status_hub={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting FiveM Status Hub v{}", env!("CARGO_PKG_VERSION"));

    let config_file = Config::resolve_path(cli.config, |key| std::env::var(key).ok());
    let mut config = Config::load_from_file(&config_file)?;
    info!("Configuration loaded from: {}", config_file);

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database = Some(DatabaseConfig {
            url: database_url,
            max_connections: config.database.as_ref().and_then(|db| db.max_connections),
        });
    }
    let config = Arc::new(config);

    let settings: Arc<dyn SettingsRepository> = match &config.database {
        Some(database_config) => {
            let database = Database::new(database_config).await?;
            database.migrate().await?;
            info!("Database connection established and migrations applied");
            Arc::new(database.settings_repository())
        }
        None => {
            warn!("No database configured; the last known status will not survive restarts");
            Arc::new(InMemorySettingsRepository::new())
        }
    };

    let client = FiveMStatusClient::from_config(&config.game_server, &config.classification)?;
    info!("Polling game server at {}", config.game_server.address());

    let aggregator = Arc::new(SnapshotAggregator::new(
        Arc::new(client),
        Arc::new(StatusCache::new()),
        settings,
        &config.game_server,
    ));
    if aggregator.restore_from_settings().await {
        info!("Restored last known server status from settings");
    }

    let hub = Arc::new(BroadcastHub::new(
        aggregator.clone(),
        config.broadcast.heartbeat_interval,
    ));
    let scheduler = Arc::new(PollScheduler::new(
        aggregator.clone(),
        hub.clone(),
        config.game_server.poll_interval,
    ));

    let state = AppState::new(config.clone(), aggregator, hub.clone(), scheduler.clone());
    let web_server = WebServer::new(state)?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );

    // Create a channel to signal when the server is ready or fails to bind
    let (server_ready_tx, server_ready_rx) = tokio::sync::oneshot::channel();
    let shutdown_token = CancellationToken::new();

    let server_token = shutdown_token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = web_server
            .serve_with_cancellation(server_ready_tx, Some(server_token))
            .await
        {
            tracing::error!("Web server failed: {}", e);
        }
    });

    // Wait for the server bind result (success or failure)
    match server_ready_rx.await {
        Ok(Ok(())) => {
            info!("Web server is now listening, starting background services...");
        }
        Ok(Err(bind_error)) => {
            tracing::error!("Failed to bind web server: {}", bind_error);
            return Err(bind_error);
        }
        Err(_) => {
            tracing::error!("Web server task completed without signaling");
            return Err(anyhow::anyhow!("Web server failed to start"));
        }
    }

    scheduler.start().await;
    hub.start_heartbeat().await;
    info!("All services started successfully");

    wait_for_shutdown_signal().await;

    // Stop producing updates, close every socket, then drain HTTP
    scheduler.stop().await;
    hub.shutdown().await;
    shutdown_token.cancel();

    server_handle.await?;
    info!("Shutdown complete");

    Ok(())
}
