// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::cache::redis_client::RedisClient;
use crate::queue::store::{QueueError, QueueStore};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Arc;

/// 取出最高分成员并移入目标集合，整个过程在一次脚本执行中完成
const CLAIM_SCRIPT: &str = r#"
    local items = redis.call("ZREVRANGE", KEYS[1], 0, 0)
    if #items == 0 then
        return false
    end
    redis.call("ZREM", KEYS[1], items[1])
    redis.call("ZADD", KEYS[2], ARGV[1], items[1])
    return items[1]
"#;

/// Redis 分数参数，无穷大需要写成 `-inf` / `+inf`
fn score_arg(score: f64) -> String {
    if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if score == f64::INFINITY {
        "+inf".to_string()
    } else {
        score.to_string()
    }
}

/// 基于 Redis 的队列存储
pub struct RedisQueueStore {
    redis: Arc<RedisClient>,
}

impl RedisQueueStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    async fn conn(&self) -> Result<MultiplexedConnection, QueueError> {
        self.redis
            .connection()
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, QueueError> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn.zrem(key, member).await?;
        Ok(removed > 0)
    }

    async fn zrevrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, QueueError> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn.zrevrange(key, start, stop).await?;
        Ok(members)
    }

    async fn zrangebyscore(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>, QueueError> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn
            .zrangebyscore(key, score_arg(min), score_arg(max))
            .await?;
        Ok(members)
    }

    async fn zcard(&self, key: &str) -> Result<u64, QueueError> {
        let mut conn = self.conn().await?;
        let count: u64 = conn.zcard(key).await?;
        Ok(count)
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.lpush(key, value).await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, QueueError> {
        let mut conn = self.conn().await?;
        let values: Vec<String> = conn.lrange(key, start, stop).await?;
        Ok(values)
    }

    async fn llen(&self, key: &str) -> Result<u64, QueueError> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.llen(key).await?;
        Ok(len)
    }

    async fn claim_highest(
        &self,
        from: &str,
        to: &str,
        score: f64,
    ) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn().await?;
        let claimed: Option<String> = redis::Script::new(CLAIM_SCRIPT)
            .key(from)
            .key(to)
            .arg(score)
            .invoke_async(&mut conn)
            .await?;
        Ok(claimed)
    }
}
