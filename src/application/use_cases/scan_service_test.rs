// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::application::use_cases::test_support::{Harness, StubFetcher};
use crate::domain::models::monitored_domain::{Domain, ScanFrequency};
use crate::domain::repositories::ScanRepository;
use crate::queue::MemoryQueueStore;
use crate::utils::clock::ManualClock;
use chrono::{TimeZone, Utc};
use std::time::Duration;

fn queue() -> Arc<ScanQueue> {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    ));
    Arc::new(ScanQueue::new(
        Arc::new(MemoryQueueStore::new()),
        "test:queue",
        clock,
        Duration::from_secs(120),
        true,
    ))
}

fn service(harness: &Harness, queue: Option<Arc<ScanQueue>>) -> ScanService {
    ScanService::new(harness.orchestrator.clone(), harness.domains.clone(), queue)
}

#[tokio::test]
async fn test_run_scan_sync_returns_scan() {
    let harness = Harness::new(StubFetcher::responding(&[("x-frame-options", "DENY")])).await;
    let domain = harness.add_domain(ScanFrequency::Manual).await;
    let service = service(&harness, None);

    let scan = service.run_scan_sync(domain.id, ScanType::Full).await.unwrap();
    assert_eq!(scan.domain_id, domain.id);
    assert!(scan.overall_score.is_some());
}

#[tokio::test]
async fn test_run_scan_sync_maps_errors() {
    let harness = Harness::new(StubFetcher::failing("too many redirects")).await;
    let domain = harness.add_domain(ScanFrequency::Daily).await;
    let service = service(&harness, None);

    let missing = Uuid::new_v4();
    assert!(matches!(
        service.run_scan_sync(missing, ScanType::Full).await,
        Err(ScanError::DomainNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.run_scan_sync(domain.id, ScanType::Full).await,
        Err(ScanError::Failed(msg)) if msg == "too many redirects"
    ));
}

#[tokio::test]
async fn test_queue_operations_fail_fast_without_queue() {
    let harness = Harness::new(StubFetcher::responding(&[])).await;
    let service = service(&harness, None);

    let enqueued = service
        .enqueue_scan(Uuid::new_v4(), ScanType::Full, EnqueueOptions::default())
        .await;
    assert!(matches!(enqueued, Err(QueueError::Unavailable(_))));
    assert!(matches!(service.process_queue(10).await, Err(QueueError::Unavailable(_))));
    assert!(matches!(
        service.schedule_automated_scans().await,
        Err(QueueError::Unavailable(_))
    ));
    assert!(matches!(service.queue_stats().await, Err(QueueError::Unavailable(_))));
}

#[tokio::test]
async fn test_enqueued_scan_is_executed() {
    let harness = Harness::new(StubFetcher::responding(&[])).await;
    let domain = harness.add_domain(ScanFrequency::Daily).await;
    let service = service(&harness, Some(queue()));

    service
        .enqueue_scan(domain.id, ScanType::Quick, EnqueueOptions::default())
        .await
        .unwrap();
    assert_eq!(service.queue_stats().await.unwrap().pending, 1);

    let summary = service.process_queue(10).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(service.queue_stats().await.unwrap(), QueueStats::default());

    let history = harness.scans.list_by_domain(domain.id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].scan_type, ScanType::Quick);
}

#[tokio::test]
async fn test_inactive_or_deleted_domain_is_retried_not_scanned() {
    let harness = Harness::new(StubFetcher::responding(&[])).await;
    let mut inactive = Domain::new(Uuid::new_v4(), "off.example.com");
    inactive.is_active = false;
    harness.domains.create(&inactive).await.unwrap();
    let service = service(&harness, Some(queue()));

    service
        .enqueue_scan(inactive.id, ScanType::Full, EnqueueOptions::default())
        .await
        .unwrap();
    service
        .enqueue_scan(Uuid::new_v4(), ScanType::Full, EnqueueOptions::default())
        .await
        .unwrap();

    let summary = service.process_queue(10).await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.retried, 2);
    assert_eq!(service.queue_stats().await.unwrap().delayed, 2);
    assert!(harness.fetcher.calls.lock().is_empty());
}

#[tokio::test]
async fn test_schedule_enqueues_due_domains() {
    let harness = Harness::new(StubFetcher::responding(&[])).await;
    let due = harness.add_domain(ScanFrequency::Hourly).await;
    harness.add_domain(ScanFrequency::Manual).await;
    let service = service(&harness, Some(queue()));

    let job_ids = service.schedule_automated_scans().await.unwrap();
    assert_eq!(job_ids.len(), 1);
    assert_eq!(service.queue_stats().await.unwrap().pending, 1);

    let summary = service.process_queue(10).await.unwrap();
    assert_eq!(summary.processed, 1);
    let refreshed = harness.domains.find_by_id(due.id).await.unwrap().unwrap();
    assert!(refreshed.last_scanned_at.is_some());
}

#[tokio::test]
async fn test_schedule_skips_domains_already_queued() {
    let harness = Harness::new(StubFetcher::failing("connection refused")).await;
    harness.add_domain(ScanFrequency::Daily).await;
    let service = service(&harness, Some(queue()));

    assert_eq!(service.schedule_automated_scans().await.unwrap().len(), 1);
    assert!(service.schedule_automated_scans().await.unwrap().is_empty());

    // 失败的扫描进入重试退避，last_scanned_at 不前进，但也不会再次入队
    let summary = service.process_queue(10).await.unwrap();
    assert_eq!(summary.retried, 1);
    assert!(service.schedule_automated_scans().await.unwrap().is_empty());

    let stats = service.queue_stats().await.unwrap();
    assert_eq!((stats.pending, stats.delayed), (0, 1));
}
