use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use fs2::FileExt;

use agentmem_model::{MemoryRecord, RecordPatch, StorageFilter};

use crate::{sort_and_paginate, StorageAdapter, StorageError};

/// Bounded-retry lock acquisition per spec.md §5: "~50 attempts x 10 ms".
const LOCK_ATTEMPTS: usize = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(10);

/// JSON-array file store under `<dir>/memories.json`, guarded by an
/// exclusive OS lock on `<dir>/memories.lock` (spec.md §4.2, §6). Every
/// write goes through a temp-file + fsync + rename so a crash mid-write
/// never leaves `memories.json` truncated or half-written, the same
/// protocol the teacher repo's JSONL event log uses for its atomic
/// `overwrite`.
#[derive(Debug, Clone)]
pub struct FileAdapter {
    data_path: PathBuf,
    lock_path: PathBuf,
}

impl FileAdapter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            data_path: dir.join("memories.json"),
            lock_path: dir.join("memories.lock"),
        }
    }

    async fn with_lock<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Path) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let data_path = self.data_path.clone();
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = lock_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let lock_file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&lock_path)?;

            let mut attempts = 0;
            loop {
                match lock_file.try_lock_exclusive() {
                    Ok(()) => break,
                    Err(_) if attempts < LOCK_ATTEMPTS => {
                        attempts += 1;
                        std::thread::sleep(LOCK_RETRY_DELAY);
                    }
                    Err(_) => {
                        tracing::warn!(attempts = LOCK_ATTEMPTS, path = %lock_path.display(), "giving up acquiring file lock");
                        return Err(StorageError::LockTimeout(LOCK_ATTEMPTS));
                    }
                }
            }

            let result = op(&data_path);
            let _ = FileExt::unlock(&lock_file);
            result
        })
        .await
        .map_err(|e| StorageError::AdapterFailure(e.to_string()))?
    }
}

fn read_all(data_path: &Path) -> Result<Vec<MemoryRecord>, StorageError> {
    if !data_path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(data_path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

fn write_all(data_path: &Path, records: &[MemoryRecord]) -> Result<(), StorageError> {
    if let Some(parent) = data_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = data_path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp_path)?;
        let json = serde_json::to_string_pretty(records)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, data_path)?;
    Ok(())
}

#[async_trait]
impl StorageAdapter for FileAdapter {
    async fn store(&self, record: MemoryRecord) -> Result<(), StorageError> {
        self.with_lock(move |data_path| {
            let mut records = read_all(data_path)?;
            records.retain(|r| r.id != record.id);
            records.push(record);
            write_all(data_path, &records)
        })
        .await
    }

    async fn retrieve(&self, id: &str) -> Result<Option<MemoryRecord>, StorageError> {
        let id = id.to_string();
        self.with_lock(move |data_path| {
            let records = read_all(data_path)?;
            Ok(records.into_iter().find(|r| r.id == id))
        })
        .await
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), StorageError> {
        let id = id.to_string();
        self.with_lock(move |data_path| {
            let mut records = read_all(data_path)?;
            if let Some(record) = records.iter_mut().find(|r| r.id == id) {
                record.apply_patch(patch, chrono::Utc::now());
                write_all(data_path, &records)?;
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let id = id.to_string();
        self.with_lock(move |data_path| {
            let mut records = read_all(data_path)?;
            let before = records.len();
            records.retain(|r| r.id != id);
            let removed = records.len() < before;
            if removed {
                write_all(data_path, &records)?;
            }
            Ok(removed)
        })
        .await
    }

    async fn list(&self, filter: &StorageFilter) -> Result<Vec<MemoryRecord>, StorageError> {
        let filter = filter.clone();
        self.with_lock(move |data_path| {
            let records = read_all(data_path)?;
            let matched: Vec<MemoryRecord> =
                records.into_iter().filter(|r| filter.matches(r)).collect();
            Ok(sort_and_paginate(matched, filter.offset, filter.limit))
        })
        .await
    }

    async fn clear(&self, tenant_id: Option<&str>) -> Result<usize, StorageError> {
        let tenant_id = tenant_id.map(str::to_string);
        self.with_lock(move |data_path| {
            let records = read_all(data_path)?;
            match tenant_id {
                Some(tenant_id) => {
                    let before = records.len();
                    let kept: Vec<MemoryRecord> = records
                        .into_iter()
                        .filter(|r| r.tenant_id != tenant_id)
                        .collect();
                    let removed = before - kept.len();
                    write_all(data_path, &kept)?;
                    Ok(removed)
                }
                None => {
                    let removed = records.len();
                    write_all(data_path, &[])?;
                    Ok(removed)
                }
            }
        })
        .await
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
    async fn persists_across_adapter_instances() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path());
        let record = sample("tenant-a");
        let id = record.id.clone();
        adapter.store(record).await.unwrap();

        let reopened = FileAdapter::new(dir.path());
        let fetched = reopened.retrieve(&id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello world");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path());
        let record = sample("tenant-a");
        let id = record.id.clone();
        adapter.store(record).await.unwrap();

        assert!(adapter.delete(&id).await.unwrap());
        assert!(!adapter.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn clear_is_tenant_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path());
        adapter.store(sample("tenant-a")).await.unwrap();
        adapter.store(sample("tenant-b")).await.unwrap();

        let removed = adapter.clear(Some("tenant-a")).await.unwrap();
        assert_eq!(removed, 1);
        let remaining = adapter.list(&StorageFilter::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
