// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 组合抓取、分析、持久化和队列，对外提供扫描用例
pub mod use_cases;
