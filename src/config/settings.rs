// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::engines::traits::FetchOptions;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含数据库、Redis、扫描器、队列、通知、指标和日志等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 扫描器配置
    pub scanner: ScannerSettings,
    /// 队列配置
    pub queue: QueueSettings,
    /// 通知配置
    pub notifications: NotificationSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub telemetry: TelemetrySettings,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// Redis配置设置
#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL，未配置时队列不可用
    pub url: Option<String>,
    /// 建立连接的超时时间（毫秒）
    pub connect_timeout_ms: u64,
}

/// 扫描器配置设置
#[derive(Debug, Deserialize)]
pub struct ScannerSettings {
    /// 单次请求超时（毫秒）
    pub timeout_ms: u64,
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub user_agent: String,
    /// 触发分数变化通知的最小差值
    pub score_change_threshold: i32,
}

impl ScannerSettings {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout_ms: self.timeout_ms,
            follow_redirects: self.follow_redirects,
            max_redirects: self.max_redirects,
        }
    }
}

/// 队列配置设置
#[derive(Debug, Deserialize)]
pub struct QueueSettings {
    /// 队列键前缀
    pub key_prefix: String,
    /// 每轮最多处理的任务数
    pub batch_size: usize,
    /// 是否以单个原子操作领取任务
    pub atomic_claim: bool,
    /// 轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 自动调度间隔（秒）
    pub schedule_interval_secs: u64,
    /// 扫描工作者数量
    pub workers: usize,
    /// 第一次重试前的等待时间（秒）
    pub backoff_base_secs: u64,
}

impl QueueSettings {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }
}

/// 通知配置设置
#[derive(Debug, Deserialize)]
pub struct NotificationSettings {
    /// 副作用队列容量，满了之后新的通知会被丢弃
    pub channel_capacity: usize,
    /// 发送通知的并发工作者数量
    pub workers: usize,
    /// Webhook 地址，未配置时只记录日志
    pub webhook_url: Option<String>,
    /// Webhook签名密钥
    pub webhook_secret: String,
}

/// 指标配置设置
#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub listen_addr: String,
}

/// 日志配置设置
#[derive(Debug, Deserialize)]
pub struct TelemetrySettings {
    /// 是否以JSON格式输出日志
    pub json: bool,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 和 `SHIELDCSP__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("SHIELDCSP").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// 只包含默认值的配置构建器
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            // Default DB pool settings
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("redis.connect_timeout_ms", 2000)?
            // Default scanner settings
            .set_default("scanner.timeout_ms", 10_000)?
            .set_default("scanner.follow_redirects", true)?
            .set_default("scanner.max_redirects", 5)?
            .set_default("scanner.user_agent", "ShieldCSP-Scanner/1.0")?
            .set_default("scanner.score_change_threshold", 5)?
            // Default queue settings
            .set_default("queue.key_prefix", "shieldcsp:queue")?
            .set_default("queue.batch_size", 10)?
            .set_default("queue.atomic_claim", true)?
            .set_default("queue.poll_interval_secs", 5)?
            .set_default("queue.schedule_interval_secs", 300)?
            .set_default("queue.workers", 2)?
            .set_default("queue.backoff_base_secs", 120)?
            // Default notification settings
            .set_default("notifications.channel_capacity", 256)?
            .set_default("notifications.workers", 4)?
            .set_default("notifications.webhook_secret", "change-me")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .set_default("telemetry.json", false)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
