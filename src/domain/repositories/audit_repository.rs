// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::AuditEvent;
use crate::domain::repositories::domain_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 审计事件仓库特质
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn create(&self, event: &AuditEvent) -> Result<(), RepositoryError>;
    /// 按时间倒序列出团队的审计事件
    async fn list_by_team(
        &self,
        team_id: Uuid,
        limit: u64,
    ) -> Result<Vec<AuditEvent>, RepositoryError>;
}
