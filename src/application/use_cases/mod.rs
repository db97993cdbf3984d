// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 用例模块
///
/// - 扫描编排（scan_orchestrator）：单次扫描的完整流程
/// - 扫描服务（scan_service）：同步扫描、入队、处理队列和自动调度
pub mod scan_orchestrator;
pub mod scan_service;

pub use scan_orchestrator::{ScanOrchestrator, ScanOutcome};
pub use scan_service::{ScanError, ScanService};

#[cfg(test)]
pub(crate) mod test_support;
