// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 被监控的域名（monitored_domain）
/// - 扫描记录（scan）及其逐项评分（security_score）
/// - 队列中的扫描任务（scan_job）
/// - 通知与审计事件（notification）
pub mod monitored_domain;
pub mod notification;
pub mod scan;
pub mod scan_job;
pub mod security_score;
