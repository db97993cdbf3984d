// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施服务模块
///
/// 提供通知和审计这两个领域协作方的具体实现
pub mod database_audit_recorder;
pub mod logging_notifier;
pub mod webhook_notifier;

pub use database_audit_recorder::DatabaseAuditRecorder;
pub use logging_notifier::LoggingNotifier;
pub use webhook_notifier::WebhookNotifier;
