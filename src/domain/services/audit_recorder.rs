// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::AuditEventKind;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// 审计协作方，与通知一样发送即忘
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    async fn record_security_event(
        &self,
        team_id: Uuid,
        kind: AuditEventKind,
        metadata: serde_json::Value,
    ) -> Result<()>;
}
