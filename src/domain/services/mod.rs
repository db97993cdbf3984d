// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 扫描流程依赖的外部协作方接口：
/// - 通知（notifier）：分数变化、首次扫描和失败时触发
/// - 审计（audit_recorder）：每次扫描成功或失败记录一条安全事件
pub mod audit_recorder;
pub mod notifier;

pub use audit_recorder::AuditRecorder;
pub use notifier::Notifier;
