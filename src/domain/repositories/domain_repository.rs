// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::monitored_domain::Domain;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 列值无法转换为领域模型
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// 域名仓库特质
#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// 创建域名
    async fn create(&self, domain: &Domain) -> Result<Domain, RepositoryError>;
    /// 根据ID查找域名
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Domain>, RepositoryError>;
    /// 查找所有启用且频率不是 manual 的域名
    async fn find_active_scheduled(&self) -> Result<Vec<Domain>, RepositoryError>;
    /// 更新上次扫描时间
    async fn update_last_scanned(
        &self,
        id: Uuid,
        scanned_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}
