// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::analysis::{CspParser, HeaderAnalyzer};
use crate::domain::models::monitored_domain::Domain;
use crate::domain::models::notification::{
    AuditEventKind, Notification, NotificationType, Severity,
};
use crate::domain::models::scan::{Scan, ScanSnapshot, ScanType};
use crate::domain::models::security_score::SecurityScore;
use crate::domain::repositories::{DomainRepository, ScanRepository};
use crate::engines::traits::{FetchOptions, HeaderFetcher};
use crate::utils::url_utils::normalize_target;
use crate::workers::side_effect_dispatcher::SideEffectDispatcher;
use anyhow::{anyhow, Result};
use metrics::{counter, histogram};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 找不到域名时返回的错误信息
pub const DOMAIN_NOT_FOUND: &str = "Domain not found";

/// 快速扫描的超时上限（毫秒）
const QUICK_SCAN_TIMEOUT_MS: u64 = 5_000;
/// 快速扫描最多跟随的重定向次数
const QUICK_SCAN_MAX_REDIRECTS: u32 = 2;

/// 单次扫描的结果
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub success: bool,
    /// 写入的扫描记录；域名不存在或失败记录也没能写入时为空
    pub scan: Option<Scan>,
    pub error: Option<String>,
}

impl ScanOutcome {
    fn completed(scan: Scan) -> Self {
        Self {
            success: true,
            scan: Some(scan),
            error: None,
        }
    }

    fn failed(scan: Option<Scan>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            scan,
            error: Some(error.into()),
        }
    }

    /// 是否因为域名不存在而失败
    pub fn is_domain_not_found(&self) -> bool {
        !self.success && self.scan.is_none() && self.error.as_deref() == Some(DOMAIN_NOT_FOUND)
    }
}

/// 扫描编排器
///
/// 抓取 → 分析响应头 → 解析 CSP → 写入扫描记录 → 与上一次完成的扫描比较 →
/// 通知与审计。入口之后的任何错误都只被捕获一次：写入一条失败的扫描记录，
/// 再尽力发出失败通知和审计事件。编排器从不向调用方返回错误。
///
/// 同一域名的同步扫描和队列扫描之间没有互斥，二者各自计算基线，
/// 可能产生重复的变化通知。
pub struct ScanOrchestrator {
    domains: Arc<dyn DomainRepository>,
    scans: Arc<dyn ScanRepository>,
    fetcher: Arc<dyn HeaderFetcher>,
    side_effects: Arc<SideEffectDispatcher>,
    analyzer: HeaderAnalyzer,
    parser: CspParser,
    fetch_options: FetchOptions,
    score_change_threshold: i32,
}

impl ScanOrchestrator {
    /// 创建新的扫描编排器
    ///
    /// # 参数
    ///
    /// * `domains` - 域名仓库
    /// * `scans` - 扫描结果仓库
    /// * `fetcher` - 响应头抓取器
    /// * `side_effects` - 通知与审计分发器
    /// * `fetch_options` - 完整扫描使用的抓取选项
    /// * `score_change_threshold` - 触发变化通知的最小分差
    pub fn new(
        domains: Arc<dyn DomainRepository>,
        scans: Arc<dyn ScanRepository>,
        fetcher: Arc<dyn HeaderFetcher>,
        side_effects: Arc<SideEffectDispatcher>,
        fetch_options: FetchOptions,
        score_change_threshold: i32,
    ) -> Self {
        Self {
            domains,
            scans,
            fetcher,
            side_effects,
            analyzer: HeaderAnalyzer::new(),
            parser: CspParser::new(),
            fetch_options,
            score_change_threshold,
        }
    }

    /// 对指定域名执行一次扫描
    #[instrument(skip(self), fields(domain_id = %domain_id, scan_type = %scan_type))]
    pub async fn run_scan(&self, domain_id: Uuid, scan_type: ScanType) -> ScanOutcome {
        let started = Instant::now();

        let domain = match self.domains.find_by_id(domain_id).await {
            Ok(Some(domain)) => domain,
            Ok(None) => {
                warn!("Scan requested for unknown domain");
                return ScanOutcome::failed(None, DOMAIN_NOT_FOUND);
            }
            Err(e) => {
                error!("Failed to load domain: {}", e);
                let error = e.to_string();
                let scan = self
                    .persist_failure(domain_id, scan_type, &error, elapsed_ms(started))
                    .await;
                record_metrics("failed", started);
                return ScanOutcome::failed(scan, error);
            }
        };

        match self.execute(&domain, scan_type, started).await {
            Ok(scan) => {
                record_metrics("completed", started);
                info!(
                    score = scan.overall_score,
                    "Scan completed in {}ms",
                    elapsed_ms(started)
                );
                ScanOutcome::completed(scan)
            }
            Err(e) => {
                let error = e.to_string();
                warn!("Scan failed: {}", error);
                let scan = self
                    .persist_failure(domain.id, scan_type, &error, elapsed_ms(started))
                    .await;
                self.report_failure(&domain, scan.as_ref(), &error);
                record_metrics("failed", started);
                ScanOutcome::failed(scan, error)
            }
        }
    }

    /// 按扫描类型调整抓取选项
    pub fn fetch_options_for(&self, scan_type: ScanType) -> FetchOptions {
        match scan_type {
            ScanType::Quick => FetchOptions {
                timeout_ms: self.fetch_options.timeout_ms.min(QUICK_SCAN_TIMEOUT_MS),
                max_redirects: self.fetch_options.max_redirects.min(QUICK_SCAN_MAX_REDIRECTS),
                ..self.fetch_options.clone()
            },
            ScanType::Full | ScanType::HeadersOnly => self.fetch_options.clone(),
        }
    }

    async fn execute(&self, domain: &Domain, scan_type: ScanType, started: Instant) -> Result<Scan> {
        let target = normalize_target(&domain.url);
        let options = self.fetch_options_for(scan_type);
        debug!("Fetching {} with {}", target, self.fetcher.name());

        let fetched = self.fetcher.fetch(&target, &options).await;
        if !fetched.success {
            return Err(anyhow!(fetched
                .error
                .unwrap_or_else(|| "Failed to fetch headers".to_string())));
        }

        let analysis = self.analyzer.analyze(&fetched.headers);

        let csp_value = fetched.headers.get("content-security-policy").cloned();
        let csp = match (&csp_value, scan_type) {
            (Some(value), ScanType::Full | ScanType::Quick) => Some(self.parser.parse(value)),
            _ => None,
        };

        let snapshot = ScanSnapshot {
            overall_score: analysis.overall_score,
            overall_grade: Some(analysis.overall_grade),
            raw_headers: fetched.headers.into_iter().collect::<BTreeMap<_, _>>(),
            csp_policy: csp_value,
            csp_grade: csp.as_ref().map(|p| p.grade),
            csp_issues: csp.map(|p| p.issues).unwrap_or_default(),
            scan_duration_ms: elapsed_ms(started),
        };
        let scan = Scan::completed(domain.id, scan_type, snapshot);
        let scores: Vec<SecurityScore> = analysis
            .headers
            .iter()
            .map(|header| SecurityScore::from_header(scan.id, header))
            .collect();

        let scan = self.scans.create_scan(&scan, &scores).await?;
        let previous = self
            .scans
            .find_latest_completed(domain.id, Some(scan.id))
            .await?;

        self.notify_result(domain, &scan, previous.as_ref());
        self.domains
            .update_last_scanned(domain.id, scan.scanned_at)
            .await?;

        self.side_effects.audit(
            domain.team_id,
            AuditEventKind::ScoreChange,
            json!({
                "domain_id": domain.id,
                "scan_id": scan.id,
                "scan_type": scan_type,
                "score": scan.overall_score,
                "grade": scan.overall_grade,
                "previous_score": previous.as_ref().and_then(|p| p.overall_score),
            }),
        );

        Ok(scan)
    }

    /// 首次扫描发出完成通知；分差达到阈值时发出变化通知
    fn notify_result(&self, domain: &Domain, scan: &Scan, previous: Option<&Scan>) {
        let score = scan.overall_score.unwrap_or_default();
        let grade = scan
            .overall_grade
            .map(|g| g.to_string())
            .unwrap_or_default();

        let notification = match previous {
            None => Notification {
                notification_type: NotificationType::ScanCompleted,
                team_id: domain.team_id,
                domain_id: domain.id,
                title: format!("First scan completed for {}", domain.url),
                message: format!("Security score {} ({})", score, grade),
                severity: Some(Severity::Info),
                metadata: Some(json!({ "scan_id": scan.id, "score": score })),
            },
            Some(previous) => {
                let previous_score = previous.overall_score.unwrap_or_default();
                let delta = score - previous_score;
                if delta.abs() < self.score_change_threshold {
                    return;
                }
                Notification {
                    notification_type: NotificationType::ScoreChanged,
                    team_id: domain.team_id,
                    domain_id: domain.id,
                    title: format!("Security score changed for {}", domain.url),
                    message: format!(
                        "Security score went from {} to {} ({})",
                        previous_score, score, grade
                    ),
                    severity: Some(if delta < 0 {
                        Severity::Warning
                    } else {
                        Severity::Info
                    }),
                    metadata: Some(json!({
                        "scan_id": scan.id,
                        "previous_scan_id": previous.id,
                        "score": score,
                        "previous_score": previous_score,
                        "delta": delta,
                    })),
                }
            }
        };

        self.side_effects.notify(notification);
    }

    /// 写入失败的扫描记录，二次失败只记录日志
    async fn persist_failure(
        &self,
        domain_id: Uuid,
        scan_type: ScanType,
        error: &str,
        duration_ms: i64,
    ) -> Option<Scan> {
        let failed = Scan::failed(domain_id, scan_type, error, duration_ms);
        match self.scans.create_scan(&failed, &[]).await {
            Ok(scan) => Some(scan),
            Err(e) => {
                error!("Failed to record failed scan: {}", e);
                None
            }
        }
    }

    fn report_failure(&self, domain: &Domain, scan: Option<&Scan>, error: &str) {
        self.side_effects.notify(Notification {
            notification_type: NotificationType::ScanFailed,
            team_id: domain.team_id,
            domain_id: domain.id,
            title: format!("Scan failed for {}", domain.url),
            message: error.to_string(),
            severity: Some(Severity::Warning),
            metadata: scan.map(|s| json!({ "scan_id": s.id })),
        });
        self.side_effects.audit(
            domain.team_id,
            AuditEventKind::ScanFailed,
            json!({
                "domain_id": domain.id,
                "scan_id": scan.map(|s| s.id),
                "error": error,
            }),
        );
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

fn record_metrics(status: &'static str, started: Instant) {
    counter!("scans_total", "status" => status).increment(1);
    histogram!("scan_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);
}

#[cfg(test)]
#[path = "scan_orchestrator_test.rs"]
mod tests;
