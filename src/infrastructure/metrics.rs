// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标系统
///
/// 未启用时不安装 recorder，各处的 `counter!` 调用退化为空操作。
pub fn init_metrics(settings: &MetricsSettings) -> Result<()> {
    if !settings.enabled {
        return Ok(());
    }

    let addr: SocketAddr = settings
        .listen_addr
        .parse()
        .with_context(|| format!("invalid metrics address '{}'", settings.listen_addr))?;

    // 端口被占用时只告警，不影响扫描服务启动
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}", e);
        return Ok(());
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

fn describe_metrics() {
    describe_counter!("scans_total", "Total number of scans by terminal status");
    describe_histogram!("scan_duration_ms", "Duration of scans in milliseconds");
    describe_counter!(
        "queue_jobs_processed_total",
        "Total number of queued scan jobs that completed"
    );
    describe_counter!(
        "queue_jobs_retried_total",
        "Total number of queued scan jobs rescheduled with backoff"
    );
    describe_counter!(
        "queue_jobs_failed_total",
        "Total number of queued scan jobs moved to the failed list"
    );
    describe_counter!(
        "side_effects_dropped_total",
        "Notifications and audit events dropped because the dispatcher was full"
    );
    describe_gauge!("scan_queue_pending", "Jobs waiting in the priority set");
    describe_gauge!("scan_queue_delayed", "Jobs waiting in the delayed set");
}
