//! Repository trait definitions

use async_trait::async_trait;

use crate::errors::RepositoryResult;
use crate::models::{Setting, UpsertSettingRequest};

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Find a setting by key
    ///
    /// * `Ok(Some(Setting))` - Setting found
    /// * `Ok(None)` - No such key
    async fn get_setting(&self, key: &str) -> RepositoryResult<Option<Setting>>;

    /// Create the setting or replace its value and category
    async fn upsert_setting(&self, request: UpsertSettingRequest) -> RepositoryResult<Setting>;
}
