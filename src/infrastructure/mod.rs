// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 领域层抽象接口的技术实现：
/// - 缓存（cache）：Redis 客户端，扫描队列的存储后端
/// - 数据库（database）：连接、迁移和实体映射
/// - 指标（metrics）：Prometheus 导出
/// - 仓库实现（repositories）：基于 SeaORM 的仓库
/// - 服务（services）：通知和审计协作方
pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
pub mod services;
