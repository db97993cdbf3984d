// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::{AuditEventKind, Notification};
use crate::domain::services::{AuditRecorder, Notifier};
use metrics::counter;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// 发送即忘的副作用
#[derive(Debug, Clone)]
pub enum SideEffect {
    Notify(Notification),
    Audit {
        team_id: Uuid,
        kind: AuditEventKind,
        metadata: serde_json::Value,
    },
}

impl SideEffect {
    fn label(&self) -> &'static str {
        match self {
            SideEffect::Notify(_) => "notify",
            SideEffect::Audit { .. } => "audit",
        }
    }
}

/// 副作用分发器
///
/// 扫描流程通过有界通道把通知和审计事件交给固定数量的后台任务。
/// 投递从不阻塞调用方：通道满或已关闭时直接丢弃并计数。
/// 协作方返回的错误只记录日志。
pub struct SideEffectDispatcher {
    sender: Mutex<Option<mpsc::Sender<SideEffect>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SideEffectDispatcher {
    /// 启动分发器，必须在 tokio 运行时内调用
    ///
    /// # 参数
    ///
    /// * `notifier` - 通知协作方
    /// * `audit` - 审计协作方
    /// * `capacity` - 通道容量
    /// * `workers` - 后台任务数量，至少为 1
    pub fn start(
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditRecorder>,
        capacity: usize,
        workers: usize,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let receiver = receiver.clone();
                let notifier = notifier.clone();
                let audit = audit.clone();
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(effect) = next else {
                            break;
                        };
                        deliver(notifier.as_ref(), audit.as_ref(), effect).await;
                    }
                    debug!("Side effect worker {} stopped", worker_id);
                })
            })
            .collect();

        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
        })
    }

    /// 投递一条通知
    pub fn notify(&self, notification: Notification) {
        self.dispatch(SideEffect::Notify(notification));
    }

    /// 投递一条审计事件
    pub fn audit(&self, team_id: Uuid, kind: AuditEventKind, metadata: serde_json::Value) {
        self.dispatch(SideEffect::Audit {
            team_id,
            kind,
            metadata,
        });
    }

    pub fn dispatch(&self, effect: SideEffect) {
        let label = effect.label();
        let result = match self.sender.lock().as_ref() {
            Some(sender) => sender.try_send(effect),
            None => Err(TrySendError::Closed(effect)),
        };

        match result {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                counter!("side_effects_dropped_total", "kind" => label).increment(1);
                warn!("Side effect queue is full, dropping {} event", label);
            }
            Err(TrySendError::Closed(_)) => {
                counter!("side_effects_dropped_total", "kind" => label).increment(1);
                warn!("Side effect dispatcher is closed, dropping {} event", label);
            }
        }
    }

    /// 关闭通道并等待已排队的副作用处理完毕
    pub async fn shutdown(&self) {
        self.sender.lock().take();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Side effect worker ended abnormally: {}", e);
            }
        }
    }
}

async fn deliver(notifier: &dyn Notifier, audit: &dyn AuditRecorder, effect: SideEffect) {
    match effect {
        SideEffect::Notify(notification) => {
            if let Err(e) = notifier.notify(&notification).await {
                warn!(
                    "Failed to deliver {} notification for domain {}: {}",
                    notification.notification_type, notification.domain_id, e
                );
            }
        }
        SideEffect::Audit {
            team_id,
            kind,
            metadata,
        } => {
            if let Err(e) = audit.record_security_event(team_id, kind, metadata).await {
                warn!("Failed to record {} audit event: {}", kind, e);
            }
        }
    }
}

#[cfg(test)]
#[path = "side_effect_dispatcher_test.rs"]
mod tests;
