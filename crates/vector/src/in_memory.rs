use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use agentmem_model::{MemoryRecord, VectorQuery, VectorResult};

use crate::{cosine_similarity, rank_and_limit, VectorError, VectorStore};

/// Deterministic in-process back-end selected when `vector_db.url` is
/// `memory://...` or `USE_IN_MEMORY_STORE` is truthy (spec.md §6, §9).
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    initialized: AtomicBool,
    entries: RwLock<Vec<(MemoryRecord, Vec<f32>)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_initialized(&self) -> Result<(), VectorError> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(VectorError::NotInitialised)
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn initialize(&self) -> Result<(), VectorError> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert(&self, record: &MemoryRecord, embedding: &[f32]) -> Result<(), VectorError> {
        self.ensure_initialized()?;
        let mut entries = self.entries.write().await;
        entries.retain(|(existing, _)| existing.id != record.id);
        entries.push((record.clone(), embedding.to_vec()));
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        query: &VectorQuery,
    ) -> Result<Vec<VectorResult>, VectorError> {
        self.ensure_initialized()?;
        let entries = self.entries.read().await;
        let scored: Vec<VectorResult> = entries
            .iter()
            .filter(|(record, _)| query.matches_filters(record))
            .map(|(record, vector)| VectorResult {
                record: record.clone(),
                score: cosine_similarity(embedding, vector),
            })
            .collect();
        Ok(rank_and_limit(scored, query.threshold, query.limit))
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, VectorError> {
        self.ensure_initialized()?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(record, _)| !ids.contains(&record.id));
        Ok(before - entries.len())
    }

    async fn count(&self, tenant_id: Option<&str>) -> Result<usize, VectorError> {
        self.ensure_initialized()?;
        let entries = self.entries.read().await;
        Ok(match tenant_id {
            Some(tenant_id) => entries
                .iter()
                .filter(|(record, _)| record.tenant_id == tenant_id)
                .count(),
            None => entries.len(),
        })
    }

    async fn health(&self) -> Result<bool, VectorError> {
        Ok(self.initialized.load(Ordering::SeqCst))
    }

    async fn close(&self) -> Result<(), VectorError> {
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmem_model::MemoryType;

    fn record(tenant: &str) -> MemoryRecord {
        MemoryRecord::new(tenant, None, MemoryType::Fact, "hello", 0.5, chrono::Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn search_before_initialize_fails() {
        let store = InMemoryVectorStore::new();
        let query = VectorQuery::new("q", "t");
        let err = store.search(&[1.0], &query).await.unwrap_err();
        assert!(matches!(err, VectorError::NotInitialised));
    }

    #[tokio::test]
    async fn search_returns_only_matches_above_threshold() {
        let store = InMemoryVectorStore::new();
        store.initialize().await.unwrap();
        let r1 = record("tenant-a");
        let r2 = record("tenant-a");
        store.upsert(&r1, &[1.0, 0.0]).await.unwrap();
        store.upsert(&r2, &[0.0, 1.0]).await.unwrap();

        let mut query = VectorQuery::new("q", "tenant-a");
        query.threshold = 0.9;
        let results = store.search(&[1.0, 0.0], &query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, r1.id);
    }

    #[tokio::test]
    async fn delete_removes_matching_ids_and_reports_count() {
        let store = InMemoryVectorStore::new();
        store.initialize().await.unwrap();
        let r1 = record("tenant-a");
        store.upsert(&r1, &[1.0, 0.0]).await.unwrap();

        let removed = store.delete(&[r1.id.clone()]).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count(None).await.unwrap(), 0);
    }
}
