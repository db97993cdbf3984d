// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{anyhow, Result};
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// Redis客户端
///
/// 显式管理连接的生命周期：`open` 建立多路复用连接，`close` 释放它。
/// 句柄由调用方构造并传入需要它的组件，不存在进程级的全局连接。
pub struct RedisClient {
    /// Redis客户端
    client: redis::Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    connect_timeout: Duration,
}

impl RedisClient {
    /// 创建新的Redis客户端实例，此时尚未建立连接
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    /// * `connect_timeout` - 建立连接的超时时间
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisClient)` - Redis客户端实例
    /// * `Err(anyhow::Error)` - URL无效
    pub fn new(redis_url: &str, connect_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            connection: RwLock::new(None),
            connect_timeout,
        })
    }

    /// 建立连接，已连接时直接返回
    pub async fn open(&self) -> Result<()> {
        let mut guard = self.connection.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let connection = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "Redis connection timed out after {}ms",
                self.connect_timeout.as_millis()
            )
        })??;

        *guard = Some(connection);
        info!("Redis connection opened");
        Ok(())
    }

    /// 获取连接句柄
    ///
    /// 多路复用连接的克隆共享同一条底层连接
    pub async fn connection(&self) -> Result<MultiplexedConnection> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("Redis connection is not open"))
    }

    /// 是否已连接
    pub async fn is_open(&self) -> bool {
        self.connection.read().await.is_some()
    }

    /// 关闭连接，之后的 `connection` 调用会失败
    pub async fn close(&self) {
        if self.connection.write().await.take().is_some() {
            info!("Redis connection closed");
        }
    }
}
