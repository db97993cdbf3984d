// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::scan_orchestrator::ScanOrchestrator;
use crate::domain::models::scan::{Scan, ScanType};
use crate::domain::models::scan_job::{EnqueueOptions, ScanJob};
use crate::domain::repositories::{DomainRepository, RepositoryError};
use crate::queue::{ProcessSummary, QueueError, QueueStats, ScanJobExecutor, ScanQueue, ScanScheduler};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// 扫描服务错误
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Domain not found: {0}")]
    DomainNotFound(Uuid),

    #[error("Domain is inactive: {0}")]
    DomainInactive(Uuid),

    #[error("Scan failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 扫描服务
///
/// 对外提供的四个操作：同步扫描、入队、处理队列、自动调度。
/// 未配置队列时，除同步扫描外的操作都立即返回 `QueueError::Unavailable`，
/// 调用方可以退回到同步扫描。
pub struct ScanService {
    orchestrator: Arc<ScanOrchestrator>,
    domains: Arc<dyn DomainRepository>,
    queue: Option<Arc<ScanQueue>>,
    scheduler: Option<ScanScheduler>,
}

impl ScanService {
    pub fn new(
        orchestrator: Arc<ScanOrchestrator>,
        domains: Arc<dyn DomainRepository>,
        queue: Option<Arc<ScanQueue>>,
    ) -> Self {
        let scheduler = queue
            .as_ref()
            .map(|q| ScanScheduler::new(domains.clone(), q.clone()));
        Self {
            orchestrator,
            domains,
            queue,
            scheduler,
        }
    }

    /// 立即执行一次扫描，失败不重试
    pub async fn run_scan_sync(&self, domain_id: Uuid, scan_type: ScanType) -> Result<Scan, ScanError> {
        let outcome = self.orchestrator.run_scan(domain_id, scan_type).await;
        if outcome.is_domain_not_found() {
            return Err(ScanError::DomainNotFound(domain_id));
        }
        match (outcome.success, outcome.scan) {
            (true, Some(scan)) => Ok(scan),
            _ => Err(ScanError::Failed(
                outcome.error.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }

    /// 将扫描放入队列
    pub async fn enqueue_scan(
        &self,
        domain_id: Uuid,
        scan_type: ScanType,
        options: EnqueueOptions,
    ) -> Result<Uuid, QueueError> {
        self.queue()?.enqueue(domain_id, scan_type, options).await
    }

    /// 处理一批队列任务
    #[instrument(skip(self))]
    pub async fn process_queue(&self, batch_size: usize) -> Result<ProcessSummary, QueueError> {
        let executor = QueuedScanExecutor {
            orchestrator: self.orchestrator.clone(),
            domains: self.domains.clone(),
        };
        self.queue()?
            .process_scan_queue(batch_size, &executor)
            .await
    }

    /// 为到期的域名排入自动扫描
    pub async fn schedule_automated_scans(&self) -> Result<Vec<Uuid>, QueueError> {
        match &self.scheduler {
            Some(scheduler) => scheduler.schedule_automated_scans().await,
            None => Err(unconfigured()),
        }
    }

    /// 队列各部分的任务数
    pub async fn queue_stats(&self) -> Result<QueueStats, QueueError> {
        self.queue()?.stats().await
    }

    fn queue(&self) -> Result<&Arc<ScanQueue>, QueueError> {
        self.queue.as_ref().ok_or_else(unconfigured)
    }
}

fn unconfigured() -> QueueError {
    QueueError::Unavailable("scan queue is not configured".to_string())
}

/// 队列任务执行器
///
/// 任务只按ID引用域名，执行前重新确认域名存在且仍启用。
struct QueuedScanExecutor {
    orchestrator: Arc<ScanOrchestrator>,
    domains: Arc<dyn DomainRepository>,
}

#[async_trait]
impl ScanJobExecutor for QueuedScanExecutor {
    async fn execute(&self, job: &ScanJob) -> anyhow::Result<()> {
        let domain = self
            .domains
            .find_by_id(job.domain_id)
            .await
            .map_err(ScanError::from)?
            .ok_or(ScanError::DomainNotFound(job.domain_id))?;
        if !domain.is_active {
            return Err(ScanError::DomainInactive(domain.id).into());
        }

        let outcome = self.orchestrator.run_scan(domain.id, job.scan_type).await;
        if outcome.success {
            Ok(())
        } else {
            Err(ScanError::Failed(outcome.error.unwrap_or_default()).into())
        }
    }
}

#[cfg(test)]
#[path = "scan_service_test.rs"]
mod tests;
