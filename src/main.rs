// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Context;
use shieldcsp::application::use_cases::{ScanOrchestrator, ScanService};
use shieldcsp::config::settings::Settings;
use shieldcsp::domain::repositories::{AuditRepository, DomainRepository, ScanRepository};
use shieldcsp::domain::services::Notifier;
use shieldcsp::engines::header_fetcher::ReqwestHeaderFetcher;
use shieldcsp::infrastructure::cache::redis_client::RedisClient;
use shieldcsp::infrastructure::database::connection;
use shieldcsp::infrastructure::metrics::init_metrics;
use shieldcsp::infrastructure::repositories::{
    AuditRepositoryImpl, DomainRepositoryImpl, ScanRepositoryImpl,
};
use shieldcsp::infrastructure::services::{
    DatabaseAuditRecorder, LoggingNotifier, WebhookNotifier,
};
use shieldcsp::queue::{RedisQueueStore, ScanQueue};
use shieldcsp::utils::clock::SystemClock;
use shieldcsp::utils::telemetry;
use shieldcsp::workers::{ScanWorker, ScheduleWorker, SideEffectDispatcher, WorkerManager};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 主函数
///
/// 扫描工作进程入口：加载配置、连接数据库和 Redis、启动工作器，
/// 收到 Ctrl-C 后等待当前批次结束再退出。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(settings.telemetry.json);
    info!("Starting shieldcsp...");
    init_metrics(&settings.metrics)?;

    // 3. Connect to database
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);
    info!("Database connection established");

    let domains: Arc<dyn DomainRepository> = Arc::new(DomainRepositoryImpl::new(db.clone()));
    let scans: Arc<dyn ScanRepository> = Arc::new(ScanRepositoryImpl::new(db.clone()));
    let audits: Arc<dyn AuditRepository> = Arc::new(AuditRepositoryImpl::new(db.clone()));

    // 4. Notification and audit dispatch
    let notifier: Arc<dyn Notifier> = match &settings.notifications.webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(url.clone(), settings.notifications.webhook_secret.clone())
                .context("failed to build webhook client")?,
        ),
        None => Arc::new(LoggingNotifier),
    };
    let side_effects = SideEffectDispatcher::start(
        notifier,
        Arc::new(DatabaseAuditRecorder::new(audits)),
        settings.notifications.channel_capacity,
        settings.notifications.workers,
    );

    // 5. Scanner
    let fetcher = Arc::new(ReqwestHeaderFetcher::new(&settings.scanner.user_agent)?);
    let orchestrator = Arc::new(ScanOrchestrator::new(
        domains.clone(),
        scans,
        fetcher,
        side_effects.clone(),
        settings.scanner.fetch_options(),
        settings.scanner.score_change_threshold,
    ));

    // 6. Optional Redis-backed queue
    let redis = match &settings.redis.url {
        Some(url) => {
            let client = Arc::new(RedisClient::new(
                url,
                Duration::from_millis(settings.redis.connect_timeout_ms),
            )?);
            client.open().await?;
            Some(client)
        }
        None => {
            warn!("redis.url is not set, queued and scheduled scans are disabled");
            None
        }
    };
    let queue = redis.as_ref().map(|client| {
        Arc::new(ScanQueue::new(
            Arc::new(RedisQueueStore::new(client.clone())),
            &settings.queue.key_prefix,
            Arc::new(SystemClock),
            settings.queue.backoff_base(),
            settings.queue.atomic_claim,
        ))
    });
    let has_queue = queue.is_some();
    let service = Arc::new(ScanService::new(orchestrator, domains, queue));

    // 7. Start workers
    let mut manager = WorkerManager::new();
    if has_queue {
        for id in 0..settings.queue.workers {
            manager.spawn(Arc::new(ScanWorker::new(
                id,
                service.clone(),
                settings.queue.batch_size,
                Duration::from_secs(settings.queue.poll_interval_secs),
                manager.shutdown_signal(),
            )));
        }
        manager.spawn(Arc::new(ScheduleWorker::new(
            service.clone(),
            Duration::from_secs(settings.queue.schedule_interval_secs),
            manager.shutdown_signal(),
        )));
    }
    info!("Started {} workers", manager.worker_count());

    manager.wait_for_shutdown().await;

    // 8. Drain side effects and release connections
    side_effects.shutdown().await;
    if let Some(client) = redis {
        client.close().await;
    }
    info!("shieldcsp stopped");
    Ok(())
}
