// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 队列存储未配置或不可达
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    /// 存储命令执行失败
    #[error("Queue store error: {0}")]
    Store(String),

    /// 任务无法序列化或反序列化
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_timeout() || err.is_io_error() {
            QueueError::Unavailable(err.to_string())
        } else {
            QueueError::Store(err.to_string())
        }
    }
}

/// 队列存储特质
///
/// 只需要有序集合和列表两类原语。分数越大排名越靠前
/// （`zrevrange` 从最高分开始）。
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// 向有序集合添加成员，已存在则更新分数
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), QueueError>;

    /// 移除成员，返回是否确实移除了
    async fn zrem(&self, key: &str, member: &str) -> Result<bool, QueueError>;

    /// 按分数从高到低取排名区间 `[start, stop]` 内的成员
    async fn zrevrange(&self, key: &str, start: isize, stop: isize)
        -> Result<Vec<String>, QueueError>;

    /// 取分数在 `[min, max]` 内的成员，按分数从低到高
    async fn zrangebyscore(&self, key: &str, min: f64, max: f64)
        -> Result<Vec<String>, QueueError>;

    async fn zcard(&self, key: &str) -> Result<u64, QueueError>;

    async fn lpush(&self, key: &str, value: &str) -> Result<(), QueueError>;

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, QueueError>;

    async fn llen(&self, key: &str) -> Result<u64, QueueError>;

    /// 原子地弹出 `from` 中分数最高的成员并以 `score` 加入 `to`
    async fn claim_highest(
        &self,
        from: &str,
        to: &str,
        score: f64,
    ) -> Result<Option<String>, QueueError>;
}

#[async_trait]
impl<T: QueueStore + ?Sized> QueueStore for Arc<T> {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), QueueError> {
        (**self).zadd(key, member, score).await
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, QueueError> {
        (**self).zrem(key, member).await
    }

    async fn zrevrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, QueueError> {
        (**self).zrevrange(key, start, stop).await
    }

    async fn zrangebyscore(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>, QueueError> {
        (**self).zrangebyscore(key, min, max).await
    }

    async fn zcard(&self, key: &str) -> Result<u64, QueueError> {
        (**self).zcard(key).await
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), QueueError> {
        (**self).lpush(key, value).await
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, QueueError> {
        (**self).lrange(key, start, stop).await
    }

    async fn llen(&self, key: &str) -> Result<u64, QueueError> {
        (**self).llen(key).await
    }

    async fn claim_highest(
        &self,
        from: &str,
        to: &str,
        score: f64,
    ) -> Result<Option<String>, QueueError> {
        (**self).claim_highest(from, to, score).await
    }
}
