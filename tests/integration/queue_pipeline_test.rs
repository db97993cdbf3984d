// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use shieldcsp::domain::models::scan::{ScanStatus, ScanType};
use shieldcsp::domain::models::scan_job::EnqueueOptions;
use shieldcsp::domain::repositories::ScanRepository;
use shieldcsp::workers::{ScanWorker, WorkerManager};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_unreachable_origin_is_retried_then_dead_lettered() {
    let app = create_test_app().await;
    let domain = app.add_domain("http://127.0.0.1:1").await;

    let job_id = app
        .service
        .enqueue_scan(
            domain.id,
            ScanType::Full,
            EnqueueOptions {
                max_retries: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let first = app.service.process_queue(10).await.unwrap();
    assert_eq!((first.processed, first.retried, first.failed), (0, 1, 0));
    assert_eq!(app.service.queue_stats().await.unwrap().delayed, 1);

    // 2 分钟退避尚未到期
    app.clock.advance(chrono::Duration::seconds(60));
    let idle = app.service.process_queue(10).await.unwrap();
    assert_eq!(idle.promoted, 0);

    app.clock.advance(chrono::Duration::seconds(61));
    let second = app.service.process_queue(10).await.unwrap();
    assert_eq!((second.promoted, second.failed), (1, 1));

    let stats = app.service.queue_stats().await.unwrap();
    assert_eq!((stats.pending, stats.delayed, stats.failed), (0, 0, 1));
    let dead = app.queue.failed_jobs(10).await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].id, job_id);

    let history = app.scans.list_by_domain(domain.id, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|s| s.status == ScanStatus::Failed));
    app.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_scan_worker_drains_queue() {
    let app = create_test_app().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Frame-Options", "DENY"))
        .mount(&app.origin)
        .await;
    let domain = app.add_origin_domain().await;
    app.service
        .enqueue_scan(domain.id, ScanType::Quick, EnqueueOptions::default())
        .await
        .unwrap();

    let mut manager = WorkerManager::new();
    manager.spawn(Arc::new(ScanWorker::new(
        0,
        app.service.clone(),
        5,
        Duration::from_millis(10),
        manager.shutdown_signal(),
    )));

    let mut history = Vec::new();
    for _ in 0..300 {
        history = app.scans.list_by_domain(domain.id, 10).await.unwrap();
        if !history.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    manager.shutdown().await;
    app.dispatcher.shutdown().await;

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, ScanStatus::Completed);
    assert_eq!(history[0].scan_type, ScanType::Quick);
    assert_eq!(app.service.queue_stats().await.unwrap().pending, 0);
}
