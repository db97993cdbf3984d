// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scan::ScanType;
use crate::domain::models::scan_job::{EnqueueOptions, ScanJob};
use crate::queue::store::{QueueError, QueueStore};
use crate::utils::clock::Clock;
use crate::utils::retry_policy::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 任务执行方
///
/// 队列只负责取出、重试和死信，具体怎么执行一个任务由调用方决定。
#[async_trait]
pub trait ScanJobExecutor: Send + Sync {
    async fn execute(&self, job: &ScanJob) -> anyhow::Result<()>;
}

/// 队列各部分使用的键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    /// 待执行，分数为优先级
    pub priority: String,
    /// 延迟执行，分数为到期时间（毫秒时间戳）
    pub delayed: String,
    /// 执行中，分数为领取时间
    pub processing: String,
    /// 死信列表
    pub failed: String,
}

impl QueueKeys {
    pub fn new(prefix: &str) -> Self {
        Self {
            priority: format!("{}:priority", prefix),
            delayed: format!("{}:delayed", prefix),
            processing: format!("{}:processing", prefix),
            failed: format!("{}:failed", prefix),
        }
    }
}

/// 队列统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub delayed: u64,
    pub failed: u64,
}

/// 一轮处理的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    /// 从延迟集合提升到待执行集合的任务数
    pub promoted: usize,
    /// 执行成功的任务数
    pub processed: usize,
    /// 重新放回延迟集合的任务数
    pub retried: usize,
    /// 进入死信列表的任务数
    pub failed: usize,
}

/// 扫描任务队列
///
/// 由有序集合实现的优先级队列加延迟队列。多个独立的工作进程可以同时消费。
pub struct ScanQueue {
    store: Arc<dyn QueueStore>,
    keys: QueueKeys,
    clock: Arc<dyn Clock>,
    retry_policy: RetryPolicy,
    atomic_claim: bool,
}

fn timestamp_score(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64
}

impl ScanQueue {
    /// 创建队列
    ///
    /// # 参数
    ///
    /// * `store` - 队列存储
    /// * `key_prefix` - 键前缀
    /// * `clock` - 时钟
    /// * `backoff_base` - 第一次重试前的等待时间
    /// * `atomic_claim` - 是否以单个原子操作领取任务
    pub fn new(
        store: Arc<dyn QueueStore>,
        key_prefix: &str,
        clock: Arc<dyn Clock>,
        backoff_base: Duration,
        atomic_claim: bool,
    ) -> Self {
        Self {
            store,
            keys: QueueKeys::new(key_prefix),
            clock,
            retry_policy: RetryPolicy::scan_queue(backoff_base),
            atomic_claim,
        }
    }

    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// 入队
    ///
    /// `scheduled_for` 在未来的任务进入延迟集合，其余直接进入待执行集合。
    #[instrument(skip(self, options), fields(domain_id = %domain_id, scan_type = %scan_type))]
    pub async fn enqueue(
        &self,
        domain_id: Uuid,
        scan_type: ScanType,
        options: EnqueueOptions,
    ) -> Result<Uuid, QueueError> {
        let now = self.clock.now();
        let job = ScanJob::new(domain_id, scan_type, &options, now);
        let payload = serde_json::to_string(&job)?;

        match job.scheduled_for {
            Some(due) if due > now => {
                self.store
                    .zadd(&self.keys.delayed, &payload, timestamp_score(due))
                    .await?;
                debug!("Job {} delayed until {}", job.id, due);
            }
            _ => {
                self.store
                    .zadd(&self.keys.priority, &payload, f64::from(job.priority))
                    .await?;
                debug!("Job {} queued with priority {}", job.id, job.priority);
            }
        }

        Ok(job.id)
    }

    /// 把到期的延迟任务移入待执行集合
    ///
    /// 只有本次 `zrem` 确实移除了成员才会加入待执行集合，
    /// 多个进程同时提升时同一任务不会被重复加入。
    async fn promote_due(&self, now: DateTime<Utc>) -> Result<usize, QueueError> {
        let due = self
            .store
            .zrangebyscore(&self.keys.delayed, f64::NEG_INFINITY, timestamp_score(now))
            .await?;

        let mut promoted = 0;
        for payload in due {
            if !self.store.zrem(&self.keys.delayed, &payload).await? {
                continue;
            }
            let priority = match serde_json::from_str::<ScanJob>(&payload) {
                Ok(job) => f64::from(job.priority),
                Err(e) => {
                    warn!("Unreadable delayed job moved to failed list: {}", e);
                    self.store.lpush(&self.keys.failed, &payload).await?;
                    continue;
                }
            };
            self.store
                .zadd(&self.keys.priority, &payload, priority)
                .await?;
            promoted += 1;
        }
        Ok(promoted)
    }

    /// 领取优先级最高的任务并放入执行中集合
    ///
    /// 相同优先级的任务之间没有定义先后顺序。
    async fn claim(&self, now: DateTime<Utc>) -> Result<Option<String>, QueueError> {
        if self.atomic_claim {
            return self
                .store
                .claim_highest(&self.keys.priority, &self.keys.processing, timestamp_score(now))
                .await;
        }

        // 三次独立调用，并发的工作进程可能领取到同一个任务
        let Some(payload) = self
            .store
            .zrevrange(&self.keys.priority, 0, 0)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        self.store.zrem(&self.keys.priority, &payload).await?;
        self.store
            .zadd(&self.keys.processing, &payload, timestamp_score(now))
            .await?;
        Ok(Some(payload))
    }

    /// 处理一批任务
    ///
    /// 先提升到期的延迟任务，再最多领取 `batch_size` 个任务交给 `executor`。
    /// 失败且还能重试的任务按 `2^retries` 分钟退避后回到延迟集合，
    /// 重试耗尽的进入死信列表。记录结果时存储出错的任务会被丢弃并记日志，
    /// 执行中集合里的条目无论如何都会被移除。
    #[instrument(skip(self, executor))]
    pub async fn process_scan_queue(
        &self,
        batch_size: usize,
        executor: &dyn ScanJobExecutor,
    ) -> Result<ProcessSummary, QueueError> {
        let mut summary = ProcessSummary {
            promoted: self.promote_due(self.clock.now()).await?,
            ..Default::default()
        };

        for _ in 0..batch_size {
            let now = self.clock.now();
            let Some(payload) = self.claim(now).await? else {
                break;
            };

            if let Err(e) = self.settle(&payload, executor, &mut summary).await {
                error!("Failed to record job outcome, dropping it: {}", e);
                summary.failed += 1;
            }
            self.store.zrem(&self.keys.processing, &payload).await?;
        }

        if summary != ProcessSummary::default() {
            info!(
                "Queue run: promoted={}, processed={}, retried={}, failed={}",
                summary.promoted, summary.processed, summary.retried, summary.failed
            );
        }
        Ok(summary)
    }

    /// 执行一个已领取的任务并记录结果
    ///
    /// 成功的任务直接结束；失败且还能重试的放回延迟集合；
    /// 重试耗尽或无法解析的进入死信列表。
    async fn settle(
        &self,
        payload: &str,
        executor: &dyn ScanJobExecutor,
        summary: &mut ProcessSummary,
    ) -> Result<(), QueueError> {
        let mut job: ScanJob = match serde_json::from_str(payload) {
            Ok(job) => job,
            Err(e) => {
                error!("Unreadable job moved to failed list: {}", e);
                self.store.lpush(&self.keys.failed, payload).await?;
                summary.failed += 1;
                return Ok(());
            }
        };

        match executor.execute(&job).await {
            Ok(()) => {
                summary.processed += 1;
                counter!("queue_jobs_processed_total").increment(1);
            }
            Err(e) if job.can_retry() => {
                job.retries += 1;
                job.last_error = Some(e.to_string());
                let due = self.retry_policy.next_retry_time(job.retries, self.clock.now());
                job.scheduled_for = Some(due);
                warn!(
                    "Job {} failed (attempt {}/{}), retrying at {}: {}",
                    job.id, job.retries, job.max_retries, due, e
                );
                self.store
                    .zadd(
                        &self.keys.delayed,
                        &serde_json::to_string(&job)?,
                        timestamp_score(due),
                    )
                    .await?;
                summary.retried += 1;
                counter!("queue_jobs_retried_total").increment(1);
            }
            Err(e) => {
                job.last_error = Some(e.to_string());
                error!("Job {} exhausted {} retries: {}", job.id, job.max_retries, e);
                self.store
                    .lpush(&self.keys.failed, &serde_json::to_string(&job)?)
                    .await?;
                summary.failed += 1;
                counter!("queue_jobs_failed_total").increment(1);
            }
        }
        Ok(())
    }

    /// 队列统计
    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        Ok(QueueStats {
            pending: self.store.zcard(&self.keys.priority).await?,
            processing: self.store.zcard(&self.keys.processing).await?,
            delayed: self.store.zcard(&self.keys.delayed).await?,
            failed: self.store.llen(&self.keys.failed).await?,
        })
    }

    /// 已有待执行、延迟或执行中任务的域名
    ///
    /// 死信列表不计入；无法解析的成员被跳过。
    pub async fn queued_domain_ids(&self) -> Result<HashSet<Uuid>, QueueError> {
        let mut domain_ids = HashSet::new();
        for key in [&self.keys.priority, &self.keys.delayed, &self.keys.processing] {
            for payload in self.store.zrevrange(key, 0, -1).await? {
                if let Ok(job) = serde_json::from_str::<ScanJob>(&payload) {
                    domain_ids.insert(job.domain_id);
                }
            }
        }
        Ok(domain_ids)
    }

    /// 列出死信任务，最新的在前
    pub async fn failed_jobs(&self, limit: usize) -> Result<Vec<ScanJob>, QueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let raw = self
            .store
            .lrange(&self.keys.failed, 0, limit as isize - 1)
            .await?;
        Ok(raw
            .iter()
            .filter_map(|payload| match serde_json::from_str(payload) {
                Ok(job) => Some(job),
                Err(e) => {
                    warn!("Skipping unreadable failed job: {}", e);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "scan_queue_test.rs"]
mod tests;
