// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::Notification;
use anyhow::Result;
use async_trait::async_trait;

/// 通知协作方
///
/// 调用方只负责触发，从不依赖结果；失败由调用点记录后丢弃。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送通知
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 发送成功
    /// * `Err(anyhow::Error)` - 发送失败
    async fn notify(&self, notification: &Notification) -> Result<()>;
}
