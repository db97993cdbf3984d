// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::{AuditEvent, AuditEventKind};
use crate::domain::repositories::{AuditRepository, RepositoryError};
use crate::infrastructure::database::entities::audit_event;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

/// 审计事件仓库实现
#[derive(Clone)]
pub struct AuditRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl AuditRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<audit_event::Model> for AuditEvent {
    type Error = RepositoryError;

    fn try_from(model: audit_event::Model) -> Result<Self, Self::Error> {
        let kind = match model.event_kind.as_str() {
            "score-change" => AuditEventKind::ScoreChange,
            "scan-failed" => AuditEventKind::ScanFailed,
            other => {
                return Err(RepositoryError::Serialization(format!(
                    "unknown audit event kind '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            id: model.id,
            team_id: model.team_id,
            kind,
            metadata: model.metadata,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl AuditRepository for AuditRepositoryImpl {
    async fn create(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        let active_model = audit_event::ActiveModel {
            id: Set(event.id),
            team_id: Set(event.team_id),
            event_kind: Set(event.kind.as_str().to_string()),
            metadata: Set(event.metadata.clone()),
            created_at: Set(event.created_at.into()),
        };

        audit_event::Entity::insert(active_model)
            .exec(self.db.as_ref())
            .await?;

        Ok(())
    }

    async fn list_by_team(
        &self,
        team_id: Uuid,
        limit: u64,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let models = audit_event::Entity::find()
            .filter(audit_event::Column::TeamId.eq(team_id))
            .order_by_desc(audit_event::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(AuditEvent::try_from).collect()
    }
}
