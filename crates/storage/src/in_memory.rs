use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use agentmem_model::{MemoryRecord, RecordPatch, StorageFilter};

use crate::{sort_and_paginate, StorageAdapter, StorageError};

/// Hash-map backed adapter. Stores a *copy* on write and returns a copy on
/// read so callers can never mutate stored state by holding a reference
/// (spec.md §4.2, §5).
#[derive(Debug, Default)]
pub struct InMemoryAdapter {
    records: RwLock<HashMap<String, MemoryRecord>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageAdapter for InMemoryAdapter {
    async fn store(&self, record: MemoryRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn retrieve(&self, id: &str) -> Result<Option<MemoryRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(id) {
            record.apply_patch(patch, chrono::Utc::now());
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;
        Ok(records.remove(id).is_some())
    }

    async fn list(&self, filter: &StorageFilter) -> Result<Vec<MemoryRecord>, StorageError> {
        let records = self.records.read().await;
        let matched: Vec<MemoryRecord> = records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        Ok(sort_and_paginate(matched, filter.offset, filter.limit))
    }

    async fn clear(&self, tenant_id: Option<&str>) -> Result<usize, StorageError> {
        let mut records = self.records.write().await;
        match tenant_id {
            Some(tenant_id) => {
                let before = records.len();
                records.retain(|_, record| record.tenant_id != tenant_id);
                Ok(before - records.len())
            }
            None => {
                let count = records.len();
                records.clear();
                Ok(count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmem_model::MemoryType;

    fn sample(tenant: &str) -> MemoryRecord {
        MemoryRecord::new(tenant, None, MemoryType::Fact, "hello world", 0.5, chrono::Utc::now())
            .unwrap()
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips_content_and_tenant() {
        let adapter = InMemoryAdapter::new();
        let record = sample("tenant-a");
        let id = record.id.clone();
        adapter.store(record).await.unwrap();

        let fetched = adapter.retrieve(&id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello world");
        assert_eq!(fetched.tenant_id, "tenant-a");
    }

    #[tokio::test]
    async fn store_does_not_alias_caller_memory() {
        let adapter = InMemoryAdapter::new();
        let mut record = sample("tenant-a");
        let id = record.id.clone();
        adapter.store(record.clone()).await.unwrap();

        record.content = "mutated after store".to_string();
        let fetched = adapter.retrieve(&id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello world");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let adapter = InMemoryAdapter::new();
        let record = sample("tenant-a");
        let id = record.id.clone();
        adapter.store(record).await.unwrap();

        assert!(adapter.delete(&id).await.unwrap());
        assert!(!adapter.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn list_respects_tenant_isolation() {
        let adapter = InMemoryAdapter::new();
        adapter.store(sample("tenant-a")).await.unwrap();
        adapter.store(sample("tenant-b")).await.unwrap();

        let results = adapter
            .list(&StorageFilter::for_tenant("tenant-a"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.iter().all(|r| r.tenant_id == "tenant-a"));
    }

    #[tokio::test]
    async fn list_sorts_by_created_at_descending_and_paginates() {
        let adapter = InMemoryAdapter::new();
        let now = chrono::Utc::now();
        for i in 0..5 {
            let mut record = sample("tenant-a");
            record.created_at = now - chrono::Duration::seconds(i);
            adapter.store(record).await.unwrap();
        }

        let filter = StorageFilter {
            tenant_id: Some("tenant-a".to_string()),
            offset: 1,
            limit: 2,
            ..Default::default()
        };
        let results = adapter.list(&filter).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].created_at > results[1].created_at);
    }

    #[tokio::test]
    async fn clear_is_tenant_scoped_when_given() {
        let adapter = InMemoryAdapter::new();
        adapter.store(sample("tenant-a")).await.unwrap();
        adapter.store(sample("tenant-b")).await.unwrap();

        let removed = adapter.clear(Some("tenant-a")).await.unwrap();
        assert_eq!(removed, 1);
        let remaining = adapter.list(&StorageFilter::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].tenant_id, "tenant-b");
    }
}
