// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 用例测试共用的桩实现和数据库夹具

use crate::application::use_cases::scan_orchestrator::ScanOrchestrator;
use crate::domain::models::monitored_domain::{Domain, ScanFrequency};
use crate::domain::models::notification::{AuditEventKind, Notification};
use crate::domain::models::scan::Scan;
use crate::domain::models::security_score::SecurityScore;
use crate::domain::repositories::{
    DomainRepository, RepositoryError, ScanRepository,
};
use crate::domain::services::{AuditRecorder, Notifier};
use crate::engines::traits::{FetchOptions, FetchResult, HeaderFetcher};
use crate::infrastructure::repositories::{DomainRepositoryImpl, ScanRepositoryImpl};
use crate::workers::side_effect_dispatcher::SideEffectDispatcher;
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use parking_lot::Mutex;
use sea_orm::{Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub async fn setup_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let db = Arc::new(db);
    Migrator::up(db.as_ref(), None).await.unwrap();
    db
}

/// 返回预设结果并记录调用参数的抓取器
pub struct StubFetcher {
    result: Mutex<FetchResult>,
    pub calls: Mutex<Vec<(String, FetchOptions)>>,
}

impl StubFetcher {
    pub fn responding(headers: &[(&str, &str)]) -> Arc<Self> {
        let stub = Arc::new(Self {
            result: Mutex::new(FetchResult::default()),
            calls: Mutex::new(Vec::new()),
        });
        stub.respond_with(headers);
        stub
    }

    pub fn failing(error: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(FetchResult {
                success: false,
                error: Some(error.to_string()),
                ..Default::default()
            }),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn respond_with(&self, headers: &[(&str, &str)]) {
        *self.result.lock() = FetchResult {
            success: true,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            status_code: Some(200),
            final_url: "https://example.com".to_string(),
            ..Default::default()
        };
    }
}

#[async_trait]
impl HeaderFetcher for StubFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> FetchResult {
        self.calls.lock().push((url.to_string(), options.clone()));
        self.result.lock().clone()
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    pub events: Mutex<Vec<(Uuid, AuditEventKind, serde_json::Value)>>,
}

#[async_trait]
impl AuditRecorder for RecordingAudit {
    async fn record_security_event(
        &self,
        team_id: Uuid,
        kind: AuditEventKind,
        metadata: serde_json::Value,
    ) -> anyhow::Result<()> {
        self.events.lock().push((team_id, kind, metadata));
        Ok(())
    }
}

/// 所有写入都失败的扫描仓库
pub struct BrokenScanRepository;

#[async_trait]
impl ScanRepository for BrokenScanRepository {
    async fn create_scan(
        &self,
        _scan: &Scan,
        _scores: &[SecurityScore],
    ) -> Result<Scan, RepositoryError> {
        Err(RepositoryError::Serialization("disk full".to_string()))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Scan>, RepositoryError> {
        Ok(None)
    }

    async fn find_latest_completed(
        &self,
        _domain_id: Uuid,
        _exclude: Option<Uuid>,
    ) -> Result<Option<Scan>, RepositoryError> {
        Ok(None)
    }

    async fn find_scores(&self, _scan_id: Uuid) -> Result<Vec<SecurityScore>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn list_by_domain(
        &self,
        _domain_id: Uuid,
        _limit: u64,
    ) -> Result<Vec<Scan>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// 基于内存 SQLite 的完整编排夹具
pub struct Harness {
    pub domains: Arc<DomainRepositoryImpl>,
    pub scans: Arc<ScanRepositoryImpl>,
    pub fetcher: Arc<StubFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub audit: Arc<RecordingAudit>,
    pub dispatcher: Arc<SideEffectDispatcher>,
    pub orchestrator: Arc<ScanOrchestrator>,
}

impl Harness {
    pub async fn new(fetcher: Arc<StubFetcher>) -> Self {
        let db = setup_db().await;
        let domains = Arc::new(DomainRepositoryImpl::new(db.clone()));
        let scans = Arc::new(ScanRepositoryImpl::new(db));
        let notifier = Arc::new(RecordingNotifier::default());
        let audit = Arc::new(RecordingAudit::default());
        let dispatcher = SideEffectDispatcher::start(notifier.clone(), audit.clone(), 64, 1);
        let orchestrator = Arc::new(ScanOrchestrator::new(
            domains.clone(),
            scans.clone(),
            fetcher.clone(),
            dispatcher.clone(),
            FetchOptions::default(),
            5,
        ));

        Self {
            domains,
            scans,
            fetcher,
            notifier,
            audit,
            dispatcher,
            orchestrator,
        }
    }

    pub async fn add_domain(&self, frequency: ScanFrequency) -> Domain {
        let domain = Domain::new(Uuid::new_v4(), "example.com").with_frequency(frequency);
        self.domains.create(&domain).await.unwrap()
    }

    /// 等待所有副作用投递完毕
    pub async fn drain(&self) {
        self.dispatcher.shutdown().await;
    }
}
