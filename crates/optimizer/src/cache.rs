use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;
use tokio::sync::Mutex;

/// Bounded key->value cache with a per-entry TTL (spec.md §4.8). `get`
/// returns `None` (and drops the entry) once it has expired, matching the
/// teacher's `MemoryIndex` LRU-cache pattern generalised to an opaque
/// stats/result cache rather than a full-entry index.
pub struct TtlCache {
    entries: Mutex<LruCache<String, (Value, Instant)>>,
    default_ttl: Duration,
}

impl TtlCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1"),
            )),
            default_ttl,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub async fn set(&self, key: impl Into<String>, value: Value) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    pub async fn set_with_ttl(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.put(key.into(), (value, Instant::now() + ttl));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips_before_expiry() {
        let cache = TtlCache::new(4, Duration::from_secs(60));
        cache.set("k", json!({"a": 1})).await;
        assert_eq!(cache.get("k").await, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn get_returns_none_and_evicts_after_expiry() {
        let cache = TtlCache::new(4, Duration::from_millis(1));
        cache.set("k", json!(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let cache = TtlCache::new(4, Duration::from_secs(60));
        assert_eq!(cache.get("missing").await, None);
    }
}
