// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::workers::worker::Worker;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作管理器
///
/// 负责启动后台工作器，并在关闭时通知它们退出、等待当前批次结束。
pub struct WorkerManager {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for WorkerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// 新工作器使用的关闭信号
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// 在独立任务中启动工作器
    pub fn spawn(&mut self, worker: Arc<dyn Worker>) {
        let handle = tokio::spawn(async move {
            if let Err(e) = worker.run().await {
                error!("Worker {} exited with error: {}", worker.name(), e);
            }
        });
        self.handles.push(handle);
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// 等待关闭信号并关闭工作进程
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
        self.shutdown().await;
    }

    /// 通知所有工作器退出并等待它们结束
    pub async fn shutdown(&mut self) {
        info!("Shutting down workers...");
        // 没有订阅者时发送会失败，此时也无需等待
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }
        info!("Workers shut down successfully");
    }
}
