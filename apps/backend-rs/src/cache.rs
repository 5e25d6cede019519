use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use tokio::sync::Mutex;

/// Short-lived cache for public catalog responses. Entries are invalidated
/// wholesale whenever the store reports a change.
///
/// Every `clear` starts a new generation. A response built from a store read
/// that began in an older generation is never kept.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, Value>,
    locks: Cache<String, Arc<Mutex<()>>>,
    generation: Arc<AtomicU64>,
}

impl ResponseCache {
    pub fn new(ttl_seconds: u64, max_entries: u64) -> Self {
        let ttl = Duration::from_secs(ttl_seconds.max(1));
        let capacity = max_entries.max(1);
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            locks: Cache::builder()
                .max_capacity(capacity)
                .time_to_idle(ttl)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Generation to capture before reading the store for a response.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).await
    }

    /// Stores `value` unless the cache was cleared after `generation` was
    /// read. A clear that lands during the insert removes the entry again.
    pub async fn put(&self, key: String, value: Value, generation: u64) {
        if self.generation() != generation {
            return;
        }
        self.entries.insert(key.clone(), value).await;
        if self.generation() != generation {
            self.entries.invalidate(&key).await;
        }
    }

    pub async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }

    /// Per-key mutex so concurrent misses for the same query build the
    /// response once.
    pub async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .get_with(key.to_string(), async { Arc::new(Mutex::new(())) })
            .await
    }
}
