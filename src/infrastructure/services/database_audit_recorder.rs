// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::{AuditEvent, AuditEventKind};
use crate::domain::repositories::AuditRepository;
use crate::domain::services::AuditRecorder;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// 将安全事件写入审计表
#[derive(Clone)]
pub struct DatabaseAuditRecorder {
    repo: Arc<dyn AuditRepository>,
}

impl DatabaseAuditRecorder {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl AuditRecorder for DatabaseAuditRecorder {
    async fn record_security_event(
        &self,
        team_id: Uuid,
        kind: AuditEventKind,
        metadata: serde_json::Value,
    ) -> Result<()> {
        let event = AuditEvent::new(team_id, kind, metadata);
        self.repo.create(&event).await?;
        Ok(())
    }
}
