// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::ScanService;
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use metrics::gauge;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 扫描队列工作器
///
/// 按固定间隔处理一批队列任务，直到收到关闭信号。
/// 正在执行的批次不会被中断。
pub struct ScanWorker {
    name: String,
    service: Arc<ScanService>,
    batch_size: usize,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl ScanWorker {
    pub fn new(
        id: usize,
        service: Arc<ScanService>,
        batch_size: usize,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            name: format!("scan-worker-{}", id),
            service,
            batch_size,
            poll_interval,
            shutdown,
        }
    }

    async fn tick(&self) -> Result<(), WorkerError> {
        let summary = self.service.process_queue(self.batch_size).await?;
        debug!(
            "{}: promoted {}, processed {}",
            self.name, summary.promoted, summary.processed
        );

        let stats = self.service.queue_stats().await?;
        gauge!("scan_queue_pending").set(stats.pending as f64);
        gauge!("scan_queue_delayed").set(stats.delayed as f64);
        Ok(())
    }
}

#[async_trait]
impl Worker for ScanWorker {
    async fn run(&self) -> Result<(), WorkerError> {
        info!("{} started", self.name);
        let mut shutdown = self.shutdown.clone();
        let mut interval = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!("{}: {}", self.name, e);
                    }
                }
            }
        }

        info!("{} stopped", self.name);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

