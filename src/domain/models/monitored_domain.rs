// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 被监控的域名
///
/// 由外部的团队实体拥有。扫描编排器只会更新 `last_scanned_at`，
/// 调度扫描只读取扫描频率。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    /// 域名唯一标识符
    pub id: Uuid,
    /// 所属团队ID，审计和通知都发往该团队
    pub team_id: Uuid,
    /// 扫描目标，可以是裸主机名或完整URL
    pub url: String,
    /// 是否启用
    pub is_active: bool,
    /// 自动扫描频率
    pub scan_frequency: ScanFrequency,
    /// 上次扫描时间
    pub last_scanned_at: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

/// 扫描频率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanFrequency {
    Hourly,
    #[default]
    Daily,
    Weekly,
    /// 仅手动扫描，不参与自动调度
    Manual,
}

impl ScanFrequency {
    /// 自动扫描的间隔，`Manual` 返回 `None`
    pub fn interval(&self) -> Option<Duration> {
        match self {
            ScanFrequency::Hourly => Some(Duration::hours(1)),
            ScanFrequency::Daily => Some(Duration::days(1)),
            ScanFrequency::Weekly => Some(Duration::weeks(1)),
            ScanFrequency::Manual => None,
        }
    }
}

impl fmt::Display for ScanFrequency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanFrequency::Hourly => write!(f, "hourly"),
            ScanFrequency::Daily => write!(f, "daily"),
            ScanFrequency::Weekly => write!(f, "weekly"),
            ScanFrequency::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for ScanFrequency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(ScanFrequency::Hourly),
            "daily" => Ok(ScanFrequency::Daily),
            "weekly" => Ok(ScanFrequency::Weekly),
            "manual" => Ok(ScanFrequency::Manual),
            _ => Err(()),
        }
    }
}

impl Domain {
    /// 创建一个新的域名，默认启用、每日扫描
    pub fn new(team_id: Uuid, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            url: url.into(),
            is_active: true,
            scan_frequency: ScanFrequency::default(),
            last_scanned_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_frequency(mut self, frequency: ScanFrequency) -> Self {
        self.scan_frequency = frequency;
        self
    }

    /// 下次应扫描的时间
    ///
    /// 从未扫描过的域名立即到期；手动频率的域名没有到期时间。
    pub fn next_due_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let interval = self.scan_frequency.interval()?;
        Some(match self.last_scanned_at {
            Some(last) => last + interval,
            None => now,
        })
    }

    /// 是否到了自动扫描的时间
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match (self.scan_frequency.interval(), self.last_scanned_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(interval), Some(last)) => last < now - interval,
        }
    }
}
