// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::analysis::grade::Grade;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 扫描记录
///
/// 由扫描编排器创建，进入终态（`Completed` / `Failed`）后不再修改。
/// `Completed` 的扫描一定带有总分和评级，`Failed` 的扫描一定带有错误信息，
/// 这一点由 [`Scan::completed`] 和 [`Scan::failed`] 两个构造函数保证。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub scan_type: ScanType,
    pub status: ScanStatus,
    pub overall_score: Option<i32>,
    pub overall_grade: Option<Grade>,
    /// 抓取到的原始响应头（小写名称）
    pub raw_headers: Option<BTreeMap<String, String>>,
    /// 原始 CSP 策略字符串
    pub csp_policy: Option<String>,
    pub csp_grade: Option<Grade>,
    pub csp_issues: Vec<String>,
    pub scan_duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

/// 扫描类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ScanType {
    /// 完整扫描：按配置抓取并解析 CSP 策略
    #[default]
    Full,
    /// 快速扫描：更短的超时和更少的重定向
    Quick,
    /// 仅评估响应头，不单独解析 CSP 策略
    HeadersOnly,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanType::Full => write!(f, "full"),
            ScanType::Quick => write!(f, "quick"),
            ScanType::HeadersOnly => write!(f, "headers-only"),
        }
    }
}

impl FromStr for ScanType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(ScanType::Full),
            "quick" => Ok(ScanType::Quick),
            "headers-only" => Ok(ScanType::HeadersOnly),
            _ => Err(()),
        }
    }
}

/// 扫描状态
///
/// Pending → Running → Completed/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanStatus::Pending => write!(f, "pending"),
            ScanStatus::Running => write!(f, "running"),
            ScanStatus::Completed => write!(f, "completed"),
            ScanStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ScanStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScanStatus::Pending),
            "running" => Ok(ScanStatus::Running),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 完成扫描时的分析快照
#[derive(Debug, Clone, Default)]
pub struct ScanSnapshot {
    pub overall_score: i32,
    pub overall_grade: Option<Grade>,
    pub raw_headers: BTreeMap<String, String>,
    pub csp_policy: Option<String>,
    pub csp_grade: Option<Grade>,
    pub csp_issues: Vec<String>,
    pub scan_duration_ms: i64,
}

impl Scan {
    /// 创建一条已完成的扫描记录
    pub fn completed(domain_id: Uuid, scan_type: ScanType, snapshot: ScanSnapshot) -> Self {
        let grade = snapshot
            .overall_grade
            .unwrap_or_else(|| Grade::from_score(snapshot.overall_score));
        Self {
            id: Uuid::new_v4(),
            domain_id,
            scan_type,
            status: ScanStatus::Completed,
            overall_score: Some(snapshot.overall_score),
            overall_grade: Some(grade),
            raw_headers: Some(snapshot.raw_headers),
            csp_policy: snapshot.csp_policy,
            csp_grade: snapshot.csp_grade,
            csp_issues: snapshot.csp_issues,
            scan_duration_ms: Some(snapshot.scan_duration_ms),
            error_message: None,
            scanned_at: Utc::now(),
        }
    }

    /// 创建一条失败的扫描记录
    pub fn failed(
        domain_id: Uuid,
        scan_type: ScanType,
        error_message: impl Into<String>,
        scan_duration_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain_id,
            scan_type,
            status: ScanStatus::Failed,
            overall_score: None,
            overall_grade: None,
            raw_headers: None,
            csp_policy: None,
            csp_grade: None,
            csp_issues: Vec::new(),
            scan_duration_ms: Some(scan_duration_ms),
            error_message: Some(error_message.into()),
            scanned_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_scan_carries_score_and_grade() {
        let snapshot = ScanSnapshot {
            overall_score: 84,
            ..Default::default()
        };
        let scan = Scan::completed(Uuid::new_v4(), ScanType::Full, snapshot);

        assert_eq!(scan.status, ScanStatus::Completed);
        assert_eq!(scan.overall_score, Some(84));
        assert_eq!(scan.overall_grade, Some(Grade::B));
        assert!(scan.error_message.is_none());
    }

    #[test]
    fn test_failed_scan_carries_error_message() {
        let scan = Scan::failed(Uuid::new_v4(), ScanType::Quick, "request timeout after 10ms", 10);

        assert_eq!(scan.status, ScanStatus::Failed);
        assert!(scan.status.is_terminal());
        assert_eq!(scan.error_message.as_deref(), Some("request timeout after 10ms"));
        assert!(scan.overall_score.is_none());
    }

    #[test]
    fn test_scan_type_strings() {
        assert_eq!(ScanType::HeadersOnly.to_string(), "headers-only");
        assert_eq!("headers-only".parse::<ScanType>(), Ok(ScanType::HeadersOnly));
        assert_eq!(
            serde_json::to_string(&ScanType::HeadersOnly).unwrap(),
            "\"headers-only\""
        );
    }
}
