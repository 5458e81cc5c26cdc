use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category used for everything this service writes
pub const SERVER_CATEGORY: &str = "server";

/// Well-known setting keys
pub mod keys {
    /// JSON of the most recent live `StatusSnapshot`
    pub const LAST_SERVER_STATUS: &str = "last_server_status";
    /// Admin override for the offline placeholder's name
    pub const SERVER_NAME: &str = "server_name";
    /// Admin override for the offline placeholder's slot count
    pub const SERVER_MAX_PLAYERS: &str = "server_max_players";
}

/// A key/value record in the site's settings store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub category: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertSettingRequest {
    pub key: String,
    pub value: String,
    pub category: String,
}

impl UpsertSettingRequest {
    pub fn new<K: Into<String>, V: Into<String>, C: Into<String>>(
        key: K,
        value: V,
        category: C,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            category: category.into(),
        }
    }
}
