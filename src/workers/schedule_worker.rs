// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::ScanService;
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// 自动扫描调度工作器
pub struct ScheduleWorker {
    service: Arc<ScanService>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl ScheduleWorker {
    pub fn new(
        service: Arc<ScanService>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            service,
            interval,
            shutdown,
        }
    }
}

#[async_trait]
impl Worker for ScheduleWorker {
    async fn run(&self) -> Result<(), WorkerError> {
        info!("Schedule worker started");
        let mut shutdown = self.shutdown.clone();
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = interval.tick() => {
                    match self.service.schedule_automated_scans().await {
                        Ok(job_ids) if !job_ids.is_empty() => {
                            info!("Scheduled {} automated scans", job_ids.len());
                        }
                        Ok(_) => {}
                        Err(e) => error!("Failed to schedule automated scans: {}", e),
                    }
                }
            }
        }

        info!("Schedule worker stopped");
        Ok(())
    }

    fn name(&self) -> &str {
        "schedule-worker"
    }
}
