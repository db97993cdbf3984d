// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 领域层只依赖这些抽象，具体实现由基础设施层提供：
/// - 域名仓库（domain_repository）：被监控域名及其扫描频率
/// - 扫描仓库（scan_repository）：扫描记录和逐项评分
/// - 审计仓库（audit_repository）：安全审计事件
pub mod audit_repository;
pub mod domain_repository;
pub mod scan_repository;

pub use audit_repository::AuditRepository;
pub use domain_repository::{DomainRepository, RepositoryError};
pub use scan_repository::ScanRepository;
