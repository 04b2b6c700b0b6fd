//! Storage Adapter (spec.md §4.2): durable `K -> MemoryRecord` persistence
//! with filters, pagination, and tenant-scoped clearing.

pub mod error;
pub mod file;
pub mod in_memory;
pub mod stub;

pub use error::StorageError;
pub use file::FileAdapter;
pub use in_memory::InMemoryAdapter;
pub use stub::StubAdapter;

use async_trait::async_trait;

use agentmem_model::{MemoryRecord, RecordPatch, StorageFilter};

/// Contract implemented by every storage back-end. `update`/`delete` are
/// no-ops (not errors) when the id is absent, per spec.md §4.2.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn store(&self, record: MemoryRecord) -> Result<(), StorageError>;
    async fn retrieve(&self, id: &str) -> Result<Option<MemoryRecord>, StorageError>;
    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), StorageError>;
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;
    async fn list(&self, filter: &StorageFilter) -> Result<Vec<MemoryRecord>, StorageError>;
    /// Deletes all records for `tenant_id`, or every record when `None`.
    /// Returns the number of records removed.
    async fn clear(&self, tenant_id: Option<&str>) -> Result<usize, StorageError>;
}

/// Sorts by `created_at` descending, then paginates by `(offset, limit)`.
/// `limit == 0` means unlimited, matching the "0 means unlimited" idiom used
/// elsewhere in this workspace for per-tier/per-query caps.
pub fn sort_and_paginate(mut records: Vec<MemoryRecord>, offset: usize, limit: usize) -> Vec<MemoryRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let start = offset.min(records.len());
    records.drain(..start);
    if limit > 0 && records.len() > limit {
        records.truncate(limit);
    }
    records
}
