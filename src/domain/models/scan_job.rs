// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scan::ScanType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 队列中的扫描任务
///
/// 只存在于队列存储中，不写入关系库。成功后销毁；重试时带着新的
/// `scheduled_for` 回到延迟集合；重试耗尽后进入失败列表。
/// 引用的域名没有外键约束，执行前必须重新校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanJob {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub scan_type: ScanType,
    /// 数值越大优先级越高
    pub priority: i32,
    /// 已重试次数
    pub retries: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub scheduled_for: Option<DateTime<Utc>>,
    /// 最后一次失败的原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// 入队选项
#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    pub priority: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub max_retries: u32,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            scheduled_for: None,
            max_retries: 3,
        }
    }
}

impl ScanJob {
    /// 创建新的扫描任务
    pub fn new(
        domain_id: Uuid,
        scan_type: ScanType,
        options: &EnqueueOptions,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain_id,
            scan_type,
            priority: options.priority,
            retries: 0,
            max_retries: options.max_retries,
            created_at,
            scheduled_for: options.scheduled_for,
            last_error: None,
        }
    }

    /// 是否还能重试
    pub fn can_retry(&self) -> bool {
        self.retries < self.max_retries
    }
}
