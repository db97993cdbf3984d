// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::Notification;
use crate::domain::services::Notifier;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// 通过 HTTP 回调投递通知
///
/// 请求体是通知的 JSON 序列化结果，`X-ShieldCSP-Signature` 为
/// `HMAC-SHA256(secret, "{timestamp}.{body}")` 的十六进制编码。
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    secret: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            secret: secret.into(),
        })
    }

    /// 为负载生成签名
    fn generate_signature(&self, payload: &str, timestamp: i64) -> Result<String> {
        let message = format!("{}.{}", timestamp, payload);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| anyhow!("invalid webhook secret: {}", e))?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp();
        let payload = serde_json::to_string(notification)?;
        let signature = self.generate_signature(&payload, timestamp)?;

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-ShieldCSP-Signature", signature)
            .header("X-ShieldCSP-Timestamp", timestamp.to_string())
            .header("X-ShieldCSP-Event", notification.notification_type.to_string())
            .body(payload)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(anyhow!(
                "Notification delivery failed with status {}: {}",
                status,
                body
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::notification::{NotificationType, Severity};
    use uuid::Uuid;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification() -> Notification {
        Notification {
            notification_type: NotificationType::ScanFailed,
            team_id: Uuid::new_v4(),
            domain_id: Uuid::new_v4(),
            title: "Scan failed".to_string(),
            message: "request timeout after 10000ms".to_string(),
            severity: Some(Severity::Warning),
            metadata: None,
        }
    }

    #[test]
    fn test_signature_is_stable() {
        let notifier = WebhookNotifier::new("http://localhost", "secret").unwrap();
        let a = notifier.generate_signature("{}", 1_700_000_000).unwrap();
        let b = notifier.generate_signature("{}", 1_700_000_000).unwrap();
        let c = notifier.generate_signature("{}", 1_700_000_001).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_notify_posts_signed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks"))
            .and(header("X-ShieldCSP-Event", "scan_failed"))
            .and(header_exists("X-ShieldCSP-Signature"))
            .and(header_exists("X-ShieldCSP-Timestamp"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hooks", server.uri()), "secret").unwrap();
        notifier.notify(&notification()).await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_reports_rejected_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), "secret").unwrap();
        let err = notifier.notify(&notification()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
