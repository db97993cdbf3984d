// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::{Notification, Severity};
use crate::domain::services::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

/// 只写日志的通知实现，未配置 webhook 时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        match notification.severity {
            Some(Severity::Warning) | Some(Severity::Critical) => warn!(
                notification_type = %notification.notification_type,
                team_id = %notification.team_id,
                domain_id = %notification.domain_id,
                "{}: {}",
                notification.title,
                notification.message
            ),
            _ => info!(
                notification_type = %notification.notification_type,
                team_id = %notification.team_id,
                domain_id = %notification.domain_id,
                "{}: {}",
                notification.title,
                notification.message
            ),
        }
        Ok(())
    }
}
