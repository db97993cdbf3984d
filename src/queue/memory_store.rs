// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::queue::store::{QueueError, QueueStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Default)]
struct MemoryInner {
    sorted_sets: HashMap<String, HashMap<String, f64>>,
    lists: HashMap<String, VecDeque<String>>,
}

impl MemoryInner {
    /// 按分数从低到高排序，分数相同按成员字典序，与 Redis 一致
    fn ascending(&self, key: &str) -> Vec<(String, f64)> {
        let mut members: Vec<(String, f64)> = self
            .sorted_sets
            .get(key)
            .map(|set| set.iter().map(|(m, s)| (m.clone(), *s)).collect())
            .unwrap_or_default();
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        members
    }
}

/// 把 Redis 风格的（可为负的）闭区间下标转换为切片范围
fn index_range(len: usize, start: isize, stop: isize) -> Option<std::ops::Range<usize>> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some(start as usize..stop as usize + 1)
}

/// 进程内队列存储
///
/// 每个操作都在同一把锁内完成，`claim_highest` 因此天然是原子的。
/// 用于测试和单进程部署。
#[derive(Default)]
pub struct MemoryQueueStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), QueueError> {
        self.inner
            .lock()
            .sorted_sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, QueueError> {
        let mut inner = self.inner.lock();
        Ok(inner
            .sorted_sets
            .get_mut(key)
            .map(|set| set.remove(member).is_some())
            .unwrap_or(false))
    }

    async fn zrevrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, QueueError> {
        let inner = self.inner.lock();
        let mut members = inner.ascending(key);
        members.reverse();
        Ok(match index_range(members.len(), start, stop) {
            Some(range) => members[range].iter().map(|(m, _)| m.clone()).collect(),
            None => Vec::new(),
        })
    }

    async fn zrangebyscore(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>, QueueError> {
        let inner = self.inner.lock();
        Ok(inner
            .ascending(key)
            .into_iter()
            .filter(|(_, score)| *score >= min && *score <= max)
            .map(|(member, _)| member)
            .collect())
    }

    async fn zcard(&self, key: &str) -> Result<u64, QueueError> {
        let inner = self.inner.lock();
        Ok(inner.sorted_sets.get(key).map_or(0, |set| set.len() as u64))
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), QueueError> {
        self.inner
            .lock()
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, QueueError> {
        let inner = self.inner.lock();
        let Some(list) = inner.lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(match index_range(list.len(), start, stop) {
            Some(range) => list.range(range).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn llen(&self, key: &str) -> Result<u64, QueueError> {
        let inner = self.inner.lock();
        Ok(inner.lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn claim_highest(
        &self,
        from: &str,
        to: &str,
        score: f64,
    ) -> Result<Option<String>, QueueError> {
        let mut inner = self.inner.lock();
        let Some((member, _)) = inner.ascending(from).pop() else {
            return Ok(None);
        };
        if let Some(set) = inner.sorted_sets.get_mut(from) {
            set.remove(&member);
        }
        inner
            .sorted_sets
            .entry(to.to_string())
            .or_default()
            .insert(member.clone(), score);
        Ok(Some(member))
    }
}
