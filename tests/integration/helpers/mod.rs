// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{TimeZone, Utc};
use sea_orm::DatabaseConnection;
use shieldcsp::application::use_cases::{ScanOrchestrator, ScanService};
use shieldcsp::config::settings::DatabaseSettings;
use shieldcsp::domain::models::monitored_domain::{Domain, ScanFrequency};
use shieldcsp::domain::repositories::DomainRepository;
use shieldcsp::engines::header_fetcher::{ReqwestHeaderFetcher, DEFAULT_USER_AGENT};
use shieldcsp::engines::traits::FetchOptions;
use shieldcsp::infrastructure::database::connection;
use shieldcsp::infrastructure::repositories::{
    AuditRepositoryImpl, DomainRepositoryImpl, ScanRepositoryImpl,
};
use shieldcsp::infrastructure::services::{DatabaseAuditRecorder, WebhookNotifier};
use shieldcsp::queue::{MemoryQueueStore, ScanQueue};
use shieldcsp::utils::clock::ManualClock;
use shieldcsp::workers::SideEffectDispatcher;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::MockServer;

/// 完整装配的扫描服务，源站和通知回调都指向本地模拟服务器
#[allow(dead_code)]
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub domains: Arc<DomainRepositoryImpl>,
    pub scans: Arc<ScanRepositoryImpl>,
    pub audits: Arc<AuditRepositoryImpl>,
    pub dispatcher: Arc<SideEffectDispatcher>,
    pub queue: Arc<ScanQueue>,
    pub clock: Arc<ManualClock>,
    pub service: Arc<ScanService>,
    pub origin: MockServer,
    pub hooks: MockServer,
}

pub async fn create_test_app() -> TestApp {
    let db = connection::connect_and_migrate(&DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: None,
        min_connections: None,
        connect_timeout: Some(5),
        idle_timeout: None,
    })
    .await
    .unwrap();
    let db = Arc::new(db);

    let origin = MockServer::start().await;
    let hooks = MockServer::start().await;

    let domains = Arc::new(DomainRepositoryImpl::new(db.clone()));
    let scans = Arc::new(ScanRepositoryImpl::new(db.clone()));
    let audits = Arc::new(AuditRepositoryImpl::new(db.clone()));

    let dispatcher = SideEffectDispatcher::start(
        Arc::new(
            WebhookNotifier::new(format!("{}/hooks", hooks.uri()), "test-secret").unwrap(),
        ),
        Arc::new(DatabaseAuditRecorder::new(audits.clone())),
        32,
        1,
    );

    let fetcher = Arc::new(ReqwestHeaderFetcher::new(DEFAULT_USER_AGENT).unwrap());
    let orchestrator = Arc::new(ScanOrchestrator::new(
        domains.clone(),
        scans.clone(),
        fetcher,
        dispatcher.clone(),
        FetchOptions {
            timeout_ms: 2_000,
            ..Default::default()
        },
        5,
    ));

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    ));
    let queue = Arc::new(ScanQueue::new(
        Arc::new(MemoryQueueStore::new()),
        "it:queue",
        clock.clone(),
        Duration::from_secs(120),
        true,
    ));
    let service = Arc::new(ScanService::new(
        orchestrator,
        domains.clone(),
        Some(queue.clone()),
    ));

    TestApp {
        db,
        domains,
        scans,
        audits,
        dispatcher,
        queue,
        clock,
        service,
        origin,
        hooks,
    }
}

impl TestApp {
    /// 添加一个指向模拟源站的域名
    pub async fn add_origin_domain(&self) -> Domain {
        self.add_domain(&self.origin.uri()).await
    }

    pub async fn add_domain(&self, url: &str) -> Domain {
        let domain = Domain::new(Uuid::new_v4(), url).with_frequency(ScanFrequency::Hourly);
        self.domains.create(&domain).await.unwrap()
    }
}
