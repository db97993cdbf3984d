// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 扫描编排和对外的扫描服务
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 核心实体、响应头与 CSP 评分、仓库和协作方接口
pub mod domain;

/// 引擎模块
///
/// 抓取目标站点的响应头
pub mod engines;

/// 基础设施模块
///
/// 提供外部服务集成，如数据库、Redis、指标导出
pub mod infrastructure;

/// 队列模块
///
/// 扫描任务的优先级队列、延迟重试和自动调度
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现后台任务处理和工作器管理
pub mod workers;
