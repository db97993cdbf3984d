// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// 重试退避策略
///
/// 第 n 次重试前等待 `initial_backoff * multiplier^(n-1)`，不超过 `max_backoff`。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// 扫描队列的重试策略
    ///
    /// 第 n 次重试前等待 `base * 2^(n-1)`；base 为两分钟时即 2^n 分钟。
    /// 不加抖动，保证退避时间可预测。
    ///
    /// # 参数
    ///
    /// * `base` - 第一次重试的等待时间
    pub fn scan_queue(base: Duration) -> Self {
        Self {
            initial_backoff: base,
            max_backoff: Duration::from_secs(24 * 60 * 60),
            backoff_multiplier: 2.0,
        }
    }

    /// 计算下次重试的退避时间
    ///
    /// `attempt` 从 1 开始计数
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let backoff_secs =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        // 限制最大退避时间
        Duration::from_secs_f64(backoff_secs.min(self.max_backoff.as_secs_f64()))
    }

    /// 计算下次重试时间
    pub fn next_retry_time(&self, attempt: u32, base_time: DateTime<Utc>) -> DateTime<Utc> {
        let backoff = self.calculate_backoff(attempt);
        base_time + chrono::Duration::milliseconds(backoff.as_millis() as i64)
    }
}
