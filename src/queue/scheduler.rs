// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scan::ScanType;
use crate::domain::models::scan_job::EnqueueOptions;
use crate::domain::repositories::DomainRepository;
use crate::queue::scan_queue::ScanQueue;
use crate::queue::store::QueueError;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 自动扫描任务的优先级
pub const SCHEDULED_PRIORITY: i32 = 1;
/// 自动扫描任务的最大重试次数
pub const SCHEDULED_MAX_RETRIES: u32 = 2;

/// 扫描调度器
///
/// 周期性地把到期的域名放入扫描队列。
pub struct ScanScheduler {
    domains: Arc<dyn DomainRepository>,
    queue: Arc<ScanQueue>,
}

impl ScanScheduler {
    /// 创建新的调度器实例
    ///
    /// # 参数
    ///
    /// * `domains` - 域名仓库
    /// * `queue` - 扫描队列
    pub fn new(domains: Arc<dyn DomainRepository>, queue: Arc<ScanQueue>) -> Self {
        Self { domains, queue }
    }

    /// 为所有到期的域名排入一次完整扫描
    ///
    /// 选出启用、频率为 hourly/daily/weekly 且上次扫描早于频率间隔（或从未扫描）
    /// 的域名，按下次到期时间入队，优先级为 1，最多重试 2 次。
    ///
    /// 队列中已有该域名的任务（待执行、延迟或执行中，包括处于重试退避的
    /// 任务）时跳过。`last_scanned_at` 只在扫描成功后前进，不跳过的话
    /// 持续不可达的域名每轮都会被重新入队。
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<Uuid>)` - 新入队的任务ID
    /// * `Err(QueueError)` - 查询域名或入队失败
    #[instrument(skip(self))]
    pub async fn schedule_automated_scans(&self) -> Result<Vec<Uuid>, QueueError> {
        let now = self.queue.clock().now();
        let candidates = self.domains.find_active_scheduled().await?;
        let queued = self.queue.queued_domain_ids().await?;

        let mut job_ids = Vec::new();
        for domain in candidates.iter().filter(|d| d.is_due(now)) {
            if queued.contains(&domain.id) {
                debug!("Domain {} already has a queued scan, skipping", domain.id);
                continue;
            }
            let Some(next_due) = domain.next_due_at(now) else {
                continue;
            };
            let options = EnqueueOptions {
                priority: SCHEDULED_PRIORITY,
                scheduled_for: Some(next_due),
                max_retries: SCHEDULED_MAX_RETRIES,
            };

            match self.queue.enqueue(domain.id, ScanType::Full, options).await {
                Ok(job_id) => {
                    debug!("Scheduled scan {} for domain {}", job_id, domain.id);
                    job_ids.push(job_id);
                }
                Err(QueueError::Unavailable(e)) => return Err(QueueError::Unavailable(e)),
                Err(e) => warn!("Failed to schedule scan for domain {}: {}", domain.id, e),
            }
        }

        info!(
            "Scheduling sweep enqueued {} of {} candidate domains",
            job_ids.len(),
            candidates.len()
        );
        Ok(job_ids)
    }
}
