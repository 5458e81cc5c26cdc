use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    /// Optional settings database; the in-memory store is used when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub game_server: GameServerConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

/// Where the FiveM server lives and how hard we try to reach it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameServerConfig {
    #[serde(default = "default_game_server_host")]
    pub host: String,
    #[serde(default = "default_game_server_port")]
    pub port: u16,
    /// Upper bound for one complete fetch (info + players + dynamic)
    #[serde(
        default = "default_request_timeout",
        with = "duration_serde::duration"
    )]
    pub request_timeout: Duration,
    #[serde(default = "default_poll_interval", with = "duration_serde::duration")]
    pub poll_interval: Duration,
    /// Name reported when the server has never been reached
    #[serde(default = "default_fallback_server_name")]
    pub fallback_server_name: String,
    /// Slot count used when `sv_maxClients` is missing or the server is down
    #[serde(default = "default_fallback_max_players")]
    pub fallback_max_players: u32,
}

/// Name markers used to break the player list down by faction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_police_marker")]
    pub police_marker: String,
    #[serde(default = "default_medic_marker")]
    pub medic_marker: String,
    #[serde(default = "default_staff_prefix")]
    pub staff_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    #[serde(
        default = "default_heartbeat_interval",
        with = "duration_serde::duration"
    )]
    pub heartbeat_interval: Duration,
    /// Outbound messages buffered per WebSocket before the subscriber is dropped
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_game_server_host() -> String {
    DEFAULT_GAME_SERVER_HOST.to_string()
}
fn default_game_server_port() -> u16 {
    DEFAULT_GAME_SERVER_PORT
}
fn default_request_timeout() -> Duration {
    parse_default_duration(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs(3))
}
fn default_poll_interval() -> Duration {
    parse_default_duration(DEFAULT_POLL_INTERVAL, Duration::from_secs(30))
}
fn default_fallback_server_name() -> String {
    DEFAULT_FALLBACK_SERVER_NAME.to_string()
}
fn default_fallback_max_players() -> u32 {
    DEFAULT_FALLBACK_MAX_PLAYERS
}
fn default_police_marker() -> String {
    DEFAULT_POLICE_MARKER.to_string()
}
fn default_medic_marker() -> String {
    DEFAULT_MEDIC_MARKER.to_string()
}
fn default_staff_prefix() -> String {
    DEFAULT_STAFF_PREFIX.to_string()
}
fn default_heartbeat_interval() -> Duration {
    parse_default_duration(DEFAULT_HEARTBEAT_INTERVAL, Duration::from_secs(30))
}
fn default_subscriber_buffer() -> usize {
    DEFAULT_SUBSCRIBER_BUFFER
}

fn parse_default_duration(value: &str, fallback: Duration) -> Duration {
    humantime::parse_duration(value).unwrap_or(fallback)
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for GameServerConfig {
    fn default() -> Self {
        Self {
            host: default_game_server_host(),
            port: default_game_server_port(),
            request_timeout: default_request_timeout(),
            poll_interval: default_poll_interval(),
            fallback_server_name: default_fallback_server_name(),
            fallback_max_players: default_fallback_max_players(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            police_marker: default_police_marker(),
            medic_marker: default_medic_marker(),
            staff_prefix: default_staff_prefix(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: default_heartbeat_interval(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl GameServerConfig {
    /// `host:port` as used to build the upstream URLs
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// `explicit` if given, else `CONFIG_FILE` through `lookup`, else `config.toml`
    pub fn resolve_path<F>(explicit: Option<String>, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        explicit
            .or_else(|| lookup(ENV_CONFIG_FILE).filter(|path| !path.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string())
    }

    /// Read `config_file`, writing the defaults there first if it does not exist.
    ///
    /// `FIVEM_SERVER_IP` / `FIVEM_SERVER_PORT` override the game server address.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let mut config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply deployment environment variables through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_GAME_SERVER_HOST).filter(|h| !h.trim().is_empty()) {
            self.game_server.host = host.trim().to_string();
        }
        if let Some(port) = lookup(ENV_GAME_SERVER_PORT) {
            match port.trim().parse::<u16>() {
                Ok(port) => self.game_server.port = port,
                Err(e) => warn!(
                    "Ignoring {}='{}': {}",
                    ENV_GAME_SERVER_PORT, port, e
                ),
            }
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.game_server.host.trim().is_empty() {
            return Err(AppError::configuration("game_server.host must not be empty"));
        }
        if self.game_server.request_timeout.is_zero() {
            return Err(AppError::configuration(
                "game_server.request_timeout must be greater than zero",
            ));
        }
        if self.game_server.poll_interval.is_zero() {
            return Err(AppError::configuration(
                "game_server.poll_interval must be greater than zero",
            ));
        }
        if self.broadcast.heartbeat_interval.is_zero() {
            return Err(AppError::configuration(
                "broadcast.heartbeat_interval must be greater than zero",
            ));
        }
        if self.broadcast.subscriber_buffer == 0 {
            return Err(AppError::configuration(
                "broadcast.subscriber_buffer must be greater than zero",
            ));
        }
        Ok(())
    }
}
