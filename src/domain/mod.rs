// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 分析（analysis）：响应头评分和 CSP 策略解析
/// - 领域模型（models）：核心业务实体和数据结构
/// - 仓库接口（repositories）：数据持久化抽象接口
/// - 服务（services）：通知和审计协作方接口
///
/// 领域层不依赖任何外部实现。
pub mod analysis;
pub mod models;
pub mod repositories;
pub mod services;
