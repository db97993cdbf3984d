// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use shieldcsp::application::use_cases::ScanError;
use shieldcsp::domain::analysis::Grade;
use shieldcsp::domain::models::notification::AuditEventKind;
use shieldcsp::domain::models::scan::{ScanStatus, ScanType};
use shieldcsp::domain::repositories::{AuditRepository, DomainRepository, ScanRepository};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_sync_scan_end_to_end() {
    let app = create_test_app().await;
    Mock::given(method("HEAD"))
        .and(header("user-agent", "ShieldCSP-Scanner/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Security-Policy", "default-src 'self'")
                .insert_header("X-Frame-Options", "SAMEORIGIN")
                .insert_header("X-Content-Type-Options", "nosniff"),
        )
        .mount(&app.origin)
        .await;
    Mock::given(method("POST"))
        .and(path("/hooks"))
        .and(header("X-ShieldCSP-Event", "scan_completed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.hooks)
        .await;

    let domain = app.add_origin_domain().await;
    let scan = app
        .service
        .run_scan_sync(domain.id, ScanType::Full)
        .await
        .unwrap();
    app.dispatcher.shutdown().await;

    assert_eq!(scan.status, ScanStatus::Completed);
    assert_eq!(scan.csp_policy.as_deref(), Some("default-src 'self'"));
    // 策略级评分：缺 4 个关键指令，无上报
    assert_eq!(scan.csp_grade, Some(Grade::F));
    assert!(scan
        .csp_issues
        .iter()
        .any(|i| i.contains("Missing script-src")));

    let scores = app.scans.find_scores(scan.id).await.unwrap();
    let xfo = scores
        .iter()
        .find(|s| s.header_name == "X-Frame-Options")
        .unwrap();
    assert!(xfo.is_present);
    assert_eq!((xfo.score, xfo.grade), (80, Grade::B));

    let refreshed = app.domains.find_by_id(domain.id).await.unwrap().unwrap();
    assert!(refreshed.last_scanned_at.is_some());

    let events = app.audits.list_by_team(domain.team_id, 10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AuditEventKind::ScoreChange);
}

#[tokio::test]
async fn test_sync_scan_reports_redirect_limit() {
    let app = create_test_app().await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/next"))
        .mount(&app.origin)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/next"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/"))
        .mount(&app.origin)
        .await;

    let domain = app.add_origin_domain().await;
    let result = app.service.run_scan_sync(domain.id, ScanType::Full).await;
    app.dispatcher.shutdown().await;

    match result {
        Err(ScanError::Failed(message)) => assert!(message.contains("redirects")),
        other => panic!("expected redirect failure, got {:?}", other),
    }

    let history = app.scans.list_by_domain(domain.id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, ScanStatus::Failed);

    let events = app.audits.list_by_team(domain.team_id, 10).await.unwrap();
    assert_eq!(events[0].kind, AuditEventKind::ScanFailed);
}
