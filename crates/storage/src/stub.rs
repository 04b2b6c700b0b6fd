use async_trait::async_trait;

use agentmem_model::{MemoryRecord, RecordPatch, StorageFilter};

use crate::{StorageAdapter, StorageError};

/// Placeholder for the external DB / distributed cache back-ends named in
/// spec.md §4.2 but not implemented here: every call fails with
/// `AdapterNotInitialised` until a real adapter takes its place.
#[derive(Debug, Default)]
pub struct StubAdapter;

impl StubAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageAdapter for StubAdapter {
    async fn store(&self, _record: MemoryRecord) -> Result<(), StorageError> {
        Err(StorageError::AdapterNotInitialised)
    }

    async fn retrieve(&self, _id: &str) -> Result<Option<MemoryRecord>, StorageError> {
        Err(StorageError::AdapterNotInitialised)
    }

    async fn update(&self, _id: &str, _patch: RecordPatch) -> Result<(), StorageError> {
        Err(StorageError::AdapterNotInitialised)
    }

    async fn delete(&self, _id: &str) -> Result<bool, StorageError> {
        Err(StorageError::AdapterNotInitialised)
    }

    async fn list(&self, _filter: &StorageFilter) -> Result<Vec<MemoryRecord>, StorageError> {
        Err(StorageError::AdapterNotInitialised)
    }

    async fn clear(&self, _tenant_id: Option<&str>) -> Result<usize, StorageError> {
        Err(StorageError::AdapterNotInitialised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_operation_reports_not_initialised() {
        let adapter = StubAdapter::new();
        assert!(matches!(
            adapter.retrieve("x").await,
            Err(StorageError::AdapterNotInitialised)
        ));
        assert!(matches!(
            adapter.list(&StorageFilter::default()).await,
            Err(StorageError::AdapterNotInitialised)
        ));
        assert!(matches!(
            adapter.clear(None).await,
            Err(StorageError::AdapterNotInitialised)
        ));
    }
}
