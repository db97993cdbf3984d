// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供扫描任务的排队、延迟、重试和调度。
/// 存储只要求有序集合与列表原语，可以是进程内存或 Redis。
pub mod memory_store;
pub mod redis_store;
pub mod scan_queue;
pub mod scheduler;
pub mod store;

pub use memory_store::MemoryQueueStore;
pub use redis_store::RedisQueueStore;
pub use scan_queue::{ProcessSummary, QueueStats, ScanJobExecutor, ScanQueue};
pub use scheduler::ScanScheduler;
pub use store::{QueueError, QueueStore};
