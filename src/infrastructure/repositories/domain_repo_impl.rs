// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::monitored_domain::{Domain, ScanFrequency};
use crate::domain::repositories::{DomainRepository, RepositoryError};
use crate::infrastructure::database::entities::domain;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

/// 域名仓库实现
#[derive(Clone)]
pub struct DomainRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl DomainRepositoryImpl {
    /// 创建新的域名仓库实现
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<domain::Model> for Domain {
    type Error = RepositoryError;

    fn try_from(model: domain::Model) -> Result<Self, Self::Error> {
        let scan_frequency = model.scan_frequency.parse::<ScanFrequency>().map_err(|_| {
            RepositoryError::Serialization(format!(
                "unknown scan frequency '{}'",
                model.scan_frequency
            ))
        })?;

        Ok(Self {
            id: model.id,
            team_id: model.team_id,
            url: model.url,
            is_active: model.is_active,
            scan_frequency,
            last_scanned_at: model.last_scanned_at.map(|t| t.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl DomainRepository for DomainRepositoryImpl {
    async fn create(&self, domain: &Domain) -> Result<Domain, RepositoryError> {
        let active_model = domain::ActiveModel {
            id: Set(domain.id),
            team_id: Set(domain.team_id),
            url: Set(domain.url.clone()),
            is_active: Set(domain.is_active),
            scan_frequency: Set(domain.scan_frequency.to_string()),
            last_scanned_at: Set(domain.last_scanned_at.map(Into::into)),
            created_at: Set(domain.created_at.into()),
        };

        domain::Entity::insert(active_model)
            .exec(self.db.as_ref())
            .await?;

        Ok(domain.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Domain>, RepositoryError> {
        let model = domain::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        model.map(Domain::try_from).transpose()
    }

    async fn find_active_scheduled(&self) -> Result<Vec<Domain>, RepositoryError> {
        let models = domain::Entity::find()
            .filter(domain::Column::IsActive.eq(true))
            .filter(domain::Column::ScanFrequency.ne(ScanFrequency::Manual.to_string()))
            .order_by_asc(domain::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(Domain::try_from).collect()
    }

    async fn update_last_scanned(
        &self,
        id: Uuid,
        scanned_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut active: domain::ActiveModel = domain::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?
            .into();

        active.last_scanned_at = Set(Some(scanned_at.into()));
        active.update(self.db.as_ref()).await?;

        Ok(())
    }
}
