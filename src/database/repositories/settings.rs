//! SeaORM-based settings repository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;

use crate::entities::{prelude::Settings, settings};
use crate::errors::RepositoryResult;
use crate::models::{Setting, UpsertSettingRequest};
use crate::repositories::SettingsRepository;

pub struct SettingsSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl SettingsSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    fn model_to_domain(model: settings::Model) -> Setting {
        Setting {
            key: model.key,
            value: model.value,
            category: model.category,
            updated_at: model.updated_at,
        }
    }
}

#[async_trait]
impl SettingsRepository for SettingsSeaOrmRepository {
    async fn get_setting(&self, key: &str) -> RepositoryResult<Option<Setting>> {
        let model = Settings::find_by_id(key.to_string())
            .one(&*self.connection)
            .await?;
        Ok(model.map(Self::model_to_domain))
    }

    async fn upsert_setting(&self, request: UpsertSettingRequest) -> RepositoryResult<Setting> {
        let existing = Settings::find_by_id(request.key.clone())
            .one(&*self.connection)
            .await?;

        let now = Utc::now();

        let model = match existing {
            Some(existing_model) => {
                let mut active_model: settings::ActiveModel = existing_model.into();
                active_model.value = Set(request.value);
                active_model.category = Set(request.category);
                active_model.updated_at = Set(now);
                active_model.update(&*self.connection).await?
            }
            None => {
                let active_model = settings::ActiveModel {
                    key: Set(request.key),
                    value: Set(request.value),
                    category: Set(request.category),
                    updated_at: Set(now),
                };
                active_model.insert(&*self.connection).await?
            }
        };

        Ok(Self::model_to_domain(model))
    }
}
