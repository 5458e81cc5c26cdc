/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Config file
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

// Database defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

// Game server defaults
pub const DEFAULT_GAME_SERVER_HOST: &str = "45.89.30.198";
pub const DEFAULT_GAME_SERVER_PORT: u16 = 30120;
pub const DEFAULT_REQUEST_TIMEOUT: &str = "3s";
pub const DEFAULT_POLL_INTERVAL: &str = "30s";
pub const DEFAULT_FALLBACK_SERVER_NAME: &str = "Tokyo Edge Roleplay";
pub const DEFAULT_FALLBACK_MAX_PLAYERS: u32 = 128;

// Player classification defaults
pub const DEFAULT_POLICE_MARKER: &str = "COPE";
pub const DEFAULT_MEDIC_MARKER: &str = "SAMU";
pub const DEFAULT_STAFF_PREFIX: &str = "[STAFF]";

// Broadcast defaults
pub const DEFAULT_HEARTBEAT_INTERVAL: &str = "30s";
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

// Deployment environment variables honoured on top of the config file
pub const ENV_GAME_SERVER_HOST: &str = "FIVEM_SERVER_IP";
pub const ENV_GAME_SERVER_PORT: &str = "FIVEM_SERVER_PORT";
pub const ENV_CONFIG_FILE: &str = "CONFIG_FILE";
