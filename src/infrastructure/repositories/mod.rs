// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 基于SeaORM实现领域层定义的仓库接口
pub mod audit_repo_impl;
pub mod domain_repo_impl;
pub mod scan_repo_impl;

pub use audit_repo_impl::AuditRepositoryImpl;
pub use domain_repo_impl::DomainRepositoryImpl;
pub use scan_repo_impl::ScanRepositoryImpl;
