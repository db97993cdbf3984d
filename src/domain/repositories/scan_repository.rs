// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scan::Scan;
use crate::domain::models::security_score::SecurityScore;
use crate::domain::repositories::domain_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 扫描结果仓库特质
///
/// 扫描只在进入终态时写入一次，之后只读。
#[async_trait]
pub trait ScanRepository: Send + Sync {
    /// 写入扫描记录及其逐项评分
    async fn create_scan(
        &self,
        scan: &Scan,
        scores: &[SecurityScore],
    ) -> Result<Scan, RepositoryError>;
    /// 根据ID查找扫描
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Scan>, RepositoryError>;
    /// 查找域名最近一次已完成的扫描，排除 `exclude` 指定的那一条
    async fn find_latest_completed(
        &self,
        domain_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<Option<Scan>, RepositoryError>;
    /// 查找扫描的逐项评分
    async fn find_scores(&self, scan_id: Uuid) -> Result<Vec<SecurityScore>, RepositoryError>;
    /// 按扫描时间倒序列出域名的扫描
    async fn list_by_domain(
        &self,
        domain_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Scan>, RepositoryError>;
}
