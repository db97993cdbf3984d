// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::queue::memory_store::MemoryQueueStore;
use crate::utils::clock::ManualClock;
use chrono::TimeZone;
use parking_lot::Mutex;

struct RecordingExecutor {
    executed: Mutex<Vec<ScanJob>>,
    fail: bool,
}

impl RecordingExecutor {
    fn succeeding() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn executed_priorities(&self) -> Vec<i32> {
        self.executed.lock().iter().map(|j| j.priority).collect()
    }
}

#[async_trait]
impl ScanJobExecutor for RecordingExecutor {
    async fn execute(&self, job: &ScanJob) -> anyhow::Result<()> {
        self.executed.lock().push(job.clone());
        if self.fail {
            anyhow::bail!("origin unreachable");
        }
        Ok(())
    }
}

struct Fixture {
    store: Arc<MemoryQueueStore>,
    clock: Arc<ManualClock>,
    queue: ScanQueue,
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

fn fixture(atomic_claim: bool) -> Fixture {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let queue = ScanQueue::new(
        store.clone(),
        "test:queue",
        clock.clone(),
        Duration::from_secs(120),
        atomic_claim,
    );
    Fixture {
        store,
        clock,
        queue,
    }
}

async fn delayed_jobs(fixture: &Fixture) -> Vec<ScanJob> {
    fixture
        .store
        .zrangebyscore(&fixture.queue.keys().delayed, f64::NEG_INFINITY, f64::INFINITY)
        .await
        .unwrap()
        .iter()
        .map(|raw| serde_json::from_str(raw).unwrap())
        .collect()
}

#[tokio::test]
async fn test_delayed_job_waits_for_due_time() {
    let f = fixture(true);
    let executor = RecordingExecutor::succeeding();
    let options = EnqueueOptions {
        scheduled_for: Some(start_time() + chrono::Duration::hours(1)),
        ..Default::default()
    };
    f.queue
        .enqueue(Uuid::new_v4(), ScanType::Full, options)
        .await
        .unwrap();

    let summary = f.queue.process_scan_queue(10, &executor).await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(f.queue.stats().await.unwrap().delayed, 1);

    f.clock.advance(chrono::Duration::minutes(61));
    let summary = f.queue.process_scan_queue(10, &executor).await.unwrap();
    assert_eq!(summary.promoted, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(f.queue.stats().await.unwrap(), QueueStats::default());
}

#[tokio::test]
async fn test_past_schedule_goes_straight_to_priority_set() {
    let f = fixture(true);
    let options = EnqueueOptions {
        scheduled_for: Some(start_time() - chrono::Duration::minutes(5)),
        ..Default::default()
    };
    f.queue
        .enqueue(Uuid::new_v4(), ScanType::Quick, options)
        .await
        .unwrap();

    let stats = f.queue.stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.delayed, 0);
}

#[tokio::test]
async fn test_retry_backoff_then_failed_list() {
    let f = fixture(true);
    let executor = RecordingExecutor::failing();
    let options = EnqueueOptions {
        max_retries: 2,
        ..Default::default()
    };
    let job_id = f
        .queue
        .enqueue(Uuid::new_v4(), ScanType::Full, options)
        .await
        .unwrap();

    // first failure: 2 minutes
    let summary = f.queue.process_scan_queue(10, &executor).await.unwrap();
    assert_eq!(summary.retried, 1);
    let delayed = delayed_jobs(&f).await;
    assert_eq!(delayed.len(), 1);
    assert_eq!(delayed[0].retries, 1);
    assert_eq!(
        delayed[0].scheduled_for,
        Some(start_time() + chrono::Duration::minutes(2))
    );

    // not yet due
    let summary = f.queue.process_scan_queue(10, &executor).await.unwrap();
    assert_eq!(summary, ProcessSummary::default());

    // second failure: 4 minutes
    f.clock.advance(chrono::Duration::minutes(2));
    let summary = f.queue.process_scan_queue(10, &executor).await.unwrap();
    assert_eq!(summary.retried, 1);
    let delayed = delayed_jobs(&f).await;
    assert_eq!(delayed[0].retries, 2);
    assert_eq!(
        delayed[0].scheduled_for,
        Some(f.clock.now() + chrono::Duration::minutes(4))
    );

    // third failure: dead-lettered
    f.clock.advance(chrono::Duration::minutes(4));
    let summary = f.queue.process_scan_queue(10, &executor).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.retried, 0);

    let stats = f.queue.stats().await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.delayed, 0);
    assert_eq!(stats.processing, 0);

    let failed = f.queue.failed_jobs(10).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, job_id);
    assert_eq!(failed[0].retries, 2);
    assert_eq!(failed[0].last_error.as_deref(), Some("origin unreachable"));
    assert_eq!(executor.executed.lock().len(), 3);
}

#[tokio::test]
async fn test_highest_priority_runs_first() {
    let f = fixture(true);
    let executor = RecordingExecutor::succeeding();
    for priority in [0, 5, 1] {
        let options = EnqueueOptions {
            priority,
            ..Default::default()
        };
        f.queue
            .enqueue(Uuid::new_v4(), ScanType::Full, options)
            .await
            .unwrap();
    }

    let summary = f.queue.process_scan_queue(2, &executor).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(executor.executed_priorities(), vec![5, 1]);
    assert_eq!(f.queue.stats().await.unwrap().pending, 1);
}

#[tokio::test]
async fn test_non_atomic_claim_processes_jobs() {
    let f = fixture(false);
    let executor = RecordingExecutor::succeeding();
    for _ in 0..3 {
        f.queue
            .enqueue(Uuid::new_v4(), ScanType::HeadersOnly, EnqueueOptions::default())
            .await
            .unwrap();
    }

    let summary = f.queue.process_scan_queue(10, &executor).await.unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(f.queue.stats().await.unwrap(), QueueStats::default());
}

#[tokio::test]
async fn test_unreadable_job_is_dead_lettered() {
    let f = fixture(true);
    let executor = RecordingExecutor::succeeding();
    f.store
        .zadd(&f.queue.keys().priority, "{not json", 0.0)
        .await
        .unwrap();

    let summary = f.queue.process_scan_queue(10, &executor).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert!(executor.executed.lock().is_empty());

    let stats = f.queue.stats().await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.processing, 0);
    // unreadable entries are skipped when listing
    assert!(f.queue.failed_jobs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_keys_use_prefix() {
    let keys = QueueKeys::new("shieldcsp:queue");
    assert_eq!(keys.priority, "shieldcsp:queue:priority");
    assert_eq!(keys.delayed, "shieldcsp:queue:delayed");
    assert_eq!(keys.processing, "shieldcsp:queue:processing");
    assert_eq!(keys.failed, "shieldcsp:queue:failed");
}

/// 延迟集合写入失败的存储
struct DelayedWriteFailsStore {
    inner: MemoryQueueStore,
}

#[async_trait]
impl QueueStore for DelayedWriteFailsStore {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), QueueError> {
        if key.ends_with(":delayed") {
            return Err(QueueError::Store("READONLY replica".to_string()));
        }
        self.inner.zadd(key, member, score).await
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, QueueError> {
        self.inner.zrem(key, member).await
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, QueueError> {
        self.inner.zrevrange(key, start, stop).await
    }

    async fn zrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>, QueueError> {
        self.inner.zrangebyscore(key, min, max).await
    }

    async fn zcard(&self, key: &str) -> Result<u64, QueueError> {
        self.inner.zcard(key).await
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), QueueError> {
        self.inner.lpush(key, value).await
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, QueueError> {
        self.inner.lrange(key, start, stop).await
    }

    async fn llen(&self, key: &str) -> Result<u64, QueueError> {
        self.inner.llen(key).await
    }

    async fn claim_highest(&self, from: &str, to: &str, score: f64) -> Result<Option<String>, QueueError> {
        self.inner.claim_highest(from, to, score).await
    }
}

#[tokio::test]
async fn test_store_error_while_recording_outcome_clears_processing() {
    let queue = ScanQueue::new(
        Arc::new(DelayedWriteFailsStore {
            inner: MemoryQueueStore::new(),
        }),
        "test:queue",
        Arc::new(ManualClock::new(start_time())),
        Duration::from_secs(120),
        true,
    );
    let executor = RecordingExecutor::failing();
    for _ in 0..2 {
        queue
            .enqueue(Uuid::new_v4(), ScanType::Full, EnqueueOptions::default())
            .await
            .unwrap();
    }

    // the retry cannot be written, but the batch keeps going
    let summary = queue.process_scan_queue(10, &executor).await.unwrap();
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.retried, 0);
    assert_eq!(executor.executed.lock().len(), 2);
    assert_eq!(queue.stats().await.unwrap(), QueueStats::default());
}

#[tokio::test]
async fn test_queued_domain_ids_cover_pending_and_delayed() {
    let f = fixture(true);
    let pending = Uuid::new_v4();
    let delayed = Uuid::new_v4();
    f.queue
        .enqueue(pending, ScanType::Full, EnqueueOptions::default())
        .await
        .unwrap();
    let options = EnqueueOptions {
        scheduled_for: Some(start_time() + chrono::Duration::hours(1)),
        ..Default::default()
    };
    f.queue.enqueue(delayed, ScanType::Full, options).await.unwrap();

    let ids = f.queue.queued_domain_ids().await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&pending) && ids.contains(&delayed));
}
