use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::traits::SettingsRepository;
use crate::errors::RepositoryResult;
use crate::models::{Setting, UpsertSettingRequest};

/// Process-local settings store
#[derive(Debug, Default)]
pub struct InMemorySettingsRepository {
    settings: RwLock<HashMap<String, Setting>>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get_setting(&self, key: &str) -> RepositoryResult<Option<Setting>> {
        Ok(self.settings.read().await.get(key).cloned())
    }

    async fn upsert_setting(&self, request: UpsertSettingRequest) -> RepositoryResult<Setting> {
        let setting = Setting {
            key: request.key,
            value: request.value,
            category: request.category,
            updated_at: Utc::now(),
        };
        self.settings
            .write()
            .await
            .insert(setting.key.clone(), setting.clone());
        Ok(setting)
    }
}
