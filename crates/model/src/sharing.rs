use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::MemoryRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    Read,
    Write,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRecord {
    pub agent_id: String,
    pub action: AccessAction,
    pub timestamp: DateTime<Utc>,
    pub granted: bool,
}

/// Five role-keyed permission sets plus a public flag and optional expiry
/// (spec.md §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Permissions {
    pub read: HashSet<String>,
    pub write: HashSet<String>,
    pub delete: HashSet<String>,
    pub share: HashSet<String>,
    pub public: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Permissions {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now > expiry)
    }

    pub fn allows(&self, agent_id: &str, action: AccessAction) -> bool {
        match action {
            AccessAction::Read => self.public || self.read.contains(agent_id),
            AccessAction::Write => self.write.contains(agent_id),
            AccessAction::Delete => self.delete.contains(agent_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaStatus {
    Active,
    Stale,
    Corrupted,
    Unreachable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replica {
    pub agent_id: String,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub status: ReplicaStatus,
    pub checksum: String,
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Conflict,
    Outdated,
}

/// Bound on `access_history` length (spec.md §5: "bounded to the most recent
/// N (e.g., 1000) records").
pub const ACCESS_HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedMemory {
    pub record: MemoryRecord,
    pub owner_id: String,
    pub share_id: String,
    pub permissions: Permissions,
    pub access_history: VecDeque<AccessRecord>,
    pub sync_status: SyncStatus,
    pub version: u64,
    pub checksum: String,
    pub replicas: Vec<Replica>,
}

impl SharedMemory {
    pub fn push_access(&mut self, entry: AccessRecord) {
        self.access_history.push_back(entry);
        while self.access_history.len() > ACCESS_HISTORY_LIMIT {
            self.access_history.pop_front();
        }
    }

    /// Owner always allowed; otherwise delegate to `Permissions::allows`,
    /// honouring expiry (spec.md §4.10).
    pub fn can_access(&self, agent_id: &str, action: AccessAction, now: DateTime<Utc>) -> bool {
        if agent_id == self.owner_id {
            return true;
        }
        if self.permissions.is_expired(now) {
            return false;
        }
        self.permissions.allows(agent_id, action)
    }
}
