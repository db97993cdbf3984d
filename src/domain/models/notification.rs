// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 通知
///
/// 发往通知协作方，发送即忘，扫描流程从不依赖其结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_type: NotificationType,
    pub team_id: Uuid,
    pub domain_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: Option<Severity>,
    pub metadata: Option<serde_json::Value>,
}

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// 分数相对上一次完成的扫描变化达到阈值
    ScoreChanged,
    /// 域名的第一次扫描完成
    ScanCompleted,
    ScanFailed,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NotificationType::ScoreChanged => write!(f, "score_changed"),
            NotificationType::ScanCompleted => write!(f, "scan_completed"),
            NotificationType::ScanFailed => write!(f, "scan_failed"),
        }
    }
}

/// 严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// 审计事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEventKind {
    #[serde(rename = "score-change")]
    ScoreChange,
    #[serde(rename = "scan-failed")]
    ScanFailed,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::ScoreChange => "score-change",
            AuditEventKind::ScanFailed => "scan-failed",
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 安全审计事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub team_id: Uuid,
    pub kind: AuditEventKind,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(team_id: Uuid, kind: AuditEventKind, metadata: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            kind,
            metadata,
            created_at: Utc::now(),
        }
    }
}
