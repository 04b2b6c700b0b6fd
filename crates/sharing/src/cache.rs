use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

use agentmem_model::SharedMemory;

/// Bounded cache of recently-read shares with a fixed TTL (spec.md §4.10:
/// "successful reads are served from a bounded access-cache with per-entry
/// TTL, default 60s"), the same `lru` + `Instant` pattern as the optimiser's
/// `TtlCache`, specialised to whole `SharedMemory` values.
pub struct AccessCache {
    entries: Mutex<LruCache<String, (SharedMemory, Instant)>>,
    ttl: Duration,
}

impl AccessCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1"),
            )),
            ttl,
        }
    }

    pub async fn get(&self, share_id: &str) -> Option<SharedMemory> {
        let mut entries = self.entries.lock().await;
        match entries.get(share_id) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.pop(share_id);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, share_id: String, value: SharedMemory) {
        let mut entries = self.entries.lock().await;
        entries.put(share_id, (value, Instant::now() + self.ttl));
    }

    pub async fn invalidate(&self, share_id: &str) {
        self.entries.lock().await.pop(share_id);
    }
}
