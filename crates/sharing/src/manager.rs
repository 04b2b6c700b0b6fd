use std::collections::HashMap;

use chrono::Utc;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use agentmem_model::{
    AccessAction, AccessRecord, MemoryRecord, Permissions, Replica, ReplicaStatus, SharedMemory,
    SyncStatus,
};

use crate::cache::AccessCache;
use crate::config::SharingConfig;
use crate::error::SharingError;
use crate::query::ShareQuery;
use crate::replication::ReplicationTransport;
use crate::request::{RequestResponse, RequestStatus, SharingRequest};

fn checksum_of(record: &MemoryRecord, permissions: &Permissions) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.content.as_bytes());
    if let Ok(perm_json) = serde_json::to_vec(permissions) {
        hasher.update(&perm_json);
    }
    format!("{:x}", hasher.finalize())
}

/// Aggregate counters over every tracked share (spec.md §6 supplement).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SharingStats {
    pub total_shares: usize,
    pub total_replicas: usize,
    pub unreachable_replicas: usize,
    pub pending_sync: usize,
    pub conflicted_sync: usize,
    pub total_access_events: usize,
    pub total_pending_requests: usize,
}

/// Permission-scoped replicated shared memories, an access log, and the
/// request/approval workflow (spec.md §4.10).
pub struct SharingManager {
    shares: RwLock<HashMap<String, SharedMemory>>,
    requests: RwLock<HashMap<String, SharingRequest>>,
    config: SharingConfig,
    cache: AccessCache,
    transport: Box<dyn ReplicationTransport>,
}

impl SharingManager {
    pub fn new(config: SharingConfig, transport: Box<dyn ReplicationTransport>) -> Self {
        let cache = AccessCache::new(256, config.access_cache_ttl);
        Self {
            shares: RwLock::new(HashMap::new()),
            requests: RwLock::new(HashMap::new()),
            config,
            cache,
            transport,
        }
    }

    /// Shares `record` with `targets`, merging `partial_permissions` over
    /// defaults (`permissions.read ∪= targets`), checksumming the payload,
    /// and creating one `Replica` per target bounded by `max_replicas`
    /// (spec.md §4.10).
    pub async fn share(
        &self,
        record: MemoryRecord,
        owner_id: impl Into<String>,
        targets: Vec<String>,
        mut partial_permissions: Permissions,
    ) -> SharedMemory {
        let now = Utc::now();
        for target in &targets {
            partial_permissions.read.insert(target.clone());
        }
        let checksum = checksum_of(&record, &partial_permissions);

        let replicated_targets: Vec<&String> =
            targets.iter().take(self.config.max_replicas).collect();
        if replicated_targets.len() < targets.len() {
            tracing::warn!(
                dropped = targets.len() - replicated_targets.len(),
                "sharing target count exceeds max_replicas; extra targets not replicated"
            );
        }

        let share_id = Uuid::new_v4().to_string();
        let mut replicas = Vec::with_capacity(replicated_targets.len());
        for target in replicated_targets {
            let mut replica = Replica {
                agent_id: target.clone(),
                version: 0,
                timestamp: now,
                status: ReplicaStatus::Active,
                checksum: checksum.clone(),
                location: format!("agent://{target}"),
            };
            if !self.transport.send(&replica, record.content.as_bytes()).await {
                replica.status = ReplicaStatus::Unreachable;
            }
            replicas.push(replica);
        }

        let sync_status = if replicas.iter().any(|r| r.status != ReplicaStatus::Active) {
            SyncStatus::Conflict
        } else {
            SyncStatus::Synced
        };

        let shared = SharedMemory {
            record,
            owner_id: owner_id.into(),
            share_id: share_id.clone(),
            permissions: partial_permissions,
            access_history: Default::default(),
            sync_status,
            version: 0,
            checksum,
            replicas,
        };
        self.shares.write().await.insert(share_id, shared.clone());
        shared
    }

    /// Owner always allowed; `read` allowed if public or in `permissions.read`;
    /// otherwise action-specific set. Denials are logged and raised as
    /// `PermissionDenied`. Successful reads are served from the access cache
    /// (spec.md §4.10).
    pub async fn access(
        &self,
        share_id: &str,
        agent_id: &str,
        action: AccessAction,
    ) -> Result<SharedMemory, SharingError> {
        if action == AccessAction::Read {
            if let Some(cached) = self.cache.get(share_id).await {
                if cached.can_access(agent_id, action, Utc::now()) {
                    return Ok(cached);
                }
            }
        }

        let mut shares = self.shares.write().await;
        let shared = shares
            .get_mut(share_id)
            .ok_or_else(|| SharingError::NotFound(share_id.to_string()))?;

        let now = Utc::now();
        let granted = shared.can_access(agent_id, action, now);
        shared.push_access(AccessRecord {
            agent_id: agent_id.to_string(),
            action,
            timestamp: now,
            granted,
        });

        if !granted {
            return Err(SharingError::PermissionDenied {
                agent_id: agent_id.to_string(),
                share_id: share_id.to_string(),
                action,
            });
        }

        let result = shared.clone();
        if action == AccessAction::Read {
            self.cache.put(share_id.to_string(), result.clone()).await;
        }
        Ok(result)
    }

    /// Bumps `version`, recomputes `checksum`, sets `sync_status = pending`,
    /// applies `mutate`, then propagates to every replica in parallel
    /// (spec.md §4.10).
    pub async fn update(
        &self,
        share_id: &str,
        mutate: impl FnOnce(&mut MemoryRecord),
    ) -> Result<SharedMemory, SharingError> {
        let mut shares = self.shares.write().await;
        let shared = shares
            .get_mut(share_id)
            .ok_or_else(|| SharingError::NotFound(share_id.to_string()))?;

        mutate(&mut shared.record);
        shared.record.updated_at = Utc::now();
        shared.version += 1;
        shared.checksum = checksum_of(&shared.record, &shared.permissions);
        shared.sync_status = SyncStatus::Pending;

        let payload = shared.record.content.clone();
        let version = shared.version;
        let pending_replicas = shared.replicas.clone();
        let transport = &self.transport;
        let sends = pending_replicas.into_iter().map(|mut replica| {
            let payload = &payload;
            async move {
                replica.version = version;
                let ok = transport.send(&replica, payload.as_bytes()).await;
                (replica, ok)
            }
        });
        let results = join_all(sends).await;
        let mut any_non_active = false;
        for (index, (mut replica, ok)) in results.into_iter().enumerate() {
            if !ok {
                replica.status = ReplicaStatus::Unreachable;
            } else {
                replica.status = ReplicaStatus::Active;
            }
            any_non_active |= replica.status != ReplicaStatus::Active;
            shared.replicas[index] = replica;
        }
        shared.sync_status = if any_non_active {
            SyncStatus::Conflict
        } else {
            SyncStatus::Synced
        };

        let result = shared.clone();
        drop(shares);
        self.cache.invalidate(share_id).await;
        Ok(result)
    }

    /// Re-propagates the current record to every replica regardless of
    /// `sync_status`, for replicas that missed an `update`'s propagation
    /// (e.g. `lazy`/`on_demand` strategies, or a prior transport failure).
    /// Every replica ends at `version = shared.version` and `checksum =
    /// shared.checksum` on success (spec.md §5 invariant 7).
    pub async fn force_sync(&self, share_id: &str) -> Result<SharedMemory, SharingError> {
        let mut shares = self.shares.write().await;
        let shared = shares
            .get_mut(share_id)
            .ok_or_else(|| SharingError::NotFound(share_id.to_string()))?;

        let payload = shared.record.content.clone();
        let version = shared.version;
        let checksum = shared.checksum.clone();
        let pending_replicas = shared.replicas.clone();
        let transport = &self.transport;
        let sends = pending_replicas.into_iter().map(|mut replica| {
            let payload = &payload;
            let checksum = checksum.clone();
            async move {
                replica.version = version;
                replica.checksum = checksum;
                let ok = transport.send(&replica, payload.as_bytes()).await;
                (replica, ok)
            }
        });
        let results = join_all(sends).await;
        let mut any_non_active = false;
        for (index, (mut replica, ok)) in results.into_iter().enumerate() {
            replica.status = if ok { ReplicaStatus::Active } else { ReplicaStatus::Unreachable };
            any_non_active |= replica.status != ReplicaStatus::Active;
            shared.replicas[index] = replica;
        }
        shared.sync_status = if any_non_active { SyncStatus::Conflict } else { SyncStatus::Synced };

        let result = shared.clone();
        drop(shares);
        self.cache.invalidate(share_id).await;
        Ok(result)
    }

    /// Aggregate counters across every tracked share and pending request.
    pub async fn get_stats(&self) -> SharingStats {
        let shares = self.shares.read().await;
        let mut stats = SharingStats {
            total_shares: shares.len(),
            ..Default::default()
        };
        for shared in shares.values() {
            stats.total_replicas += shared.replicas.len();
            stats.unreachable_replicas +=
                shared.replicas.iter().filter(|r| r.status == ReplicaStatus::Unreachable).count();
            stats.total_access_events += shared.access_history.len();
            match shared.sync_status {
                SyncStatus::Pending => stats.pending_sync += 1,
                SyncStatus::Conflict => stats.conflicted_sync += 1,
                SyncStatus::Synced | SyncStatus::Outdated => {}
            }
        }
        drop(shares);
        stats.total_pending_requests = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .count();
        stats
    }

    /// Removes replicas then the local record (spec.md §4.10).
    pub async fn delete(&self, share_id: &str) -> Result<(), SharingError> {
        let mut shares = self.shares.write().await;
        let shared = shares
            .remove(share_id)
            .ok_or_else(|| SharingError::NotFound(share_id.to_string()))?;
        drop(shares);
        for replica in &shared.replicas {
            self.transport.send(replica, &[]).await;
        }
        self.cache.invalidate(share_id).await;
        Ok(())
    }

    pub async fn query(&self, filter: &ShareQuery) -> Vec<SharedMemory> {
        let shares = self.shares.read().await;
        filter
            .run(
                shares.values(),
                Utc::now(),
                self.config.relevance_max_age_days,
            )
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn request_access(
        &self,
        share_id: &str,
        requester_id: impl Into<String>,
        perms: Permissions,
        message: Option<String>,
    ) -> Result<SharingRequest, SharingError> {
        if !self.shares.read().await.contains_key(share_id) {
            return Err(SharingError::NotFound(share_id.to_string()));
        }
        let request = SharingRequest::new(share_id, requester_id, perms, message, Utc::now());
        self.requests
            .write()
            .await
            .insert(request.id.clone(), request.clone());
        Ok(request)
    }

    /// Records a response; on approval, merges the requested permissions
    /// into the target share and propagates (spec.md §4.10).
    pub async fn respond(
        &self,
        request_id: &str,
        agent_id: impl Into<String>,
        approved: bool,
        message: Option<String>,
    ) -> Result<SharingRequest, SharingError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| SharingError::RequestNotFound(request_id.to_string()))?;

        request.responses.push(RequestResponse {
            agent_id: agent_id.into(),
            approved,
            message,
            responded_at: Utc::now(),
        });
        request.status = if approved {
            RequestStatus::Approved
        } else {
            RequestStatus::Denied
        };

        if approved {
            let mut shares = self.shares.write().await;
            if let Some(shared) = shares.get_mut(&request.share_id) {
                for agent in &request.requested_permissions.read {
                    shared.permissions.read.insert(agent.clone());
                }
                for agent in &request.requested_permissions.write {
                    shared.permissions.write.insert(agent.clone());
                }
                for agent in &request.requested_permissions.delete {
                    shared.permissions.delete.insert(agent.clone());
                }
                for agent in &request.requested_permissions.share {
                    shared.permissions.share.insert(agent.clone());
                }
                shared.sync_status = SyncStatus::Pending;
            }
        }

        Ok(request.clone())
    }

    /// JSON snapshot of every share for `tenant_id` (spec.md §1 supplement).
    pub async fn export(&self, tenant_id: &str) -> Vec<SharedMemory> {
        self.shares
            .read()
            .await
            .values()
            .filter(|s| s.record.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    /// Restores a snapshot produced by [`Self::export`], overwriting shares
    /// with matching ids.
    pub async fn import(&self, snapshot: Vec<SharedMemory>) {
        let mut shares = self.shares.write().await;
        for shared in snapshot {
            shares.insert(shared.share_id.clone(), shared);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmem_model::MemoryType;

    fn record() -> MemoryRecord {
        MemoryRecord::new("t", None, MemoryType::Fact, "shared content", 0.5, Utc::now()).unwrap()
    }

    fn manager() -> SharingManager {
        SharingManager::new(
            SharingConfig::default(),
            Box::new(crate::replication::AlwaysSucceedsTransport),
        )
    }

    #[tokio::test]
    async fn share_merges_targets_into_read_permissions() {
        let manager = manager();
        let shared = manager
            .share(record(), "owner", vec!["agent-a".to_string()], Permissions::default())
            .await;
        assert!(shared.permissions.read.contains("agent-a"));
        assert_eq!(shared.replicas.len(), 1);
    }

    #[tokio::test]
    async fn non_owner_without_read_permission_is_denied() {
        let manager = manager();
        let shared = manager
            .share(record(), "owner", vec![], Permissions::default())
            .await;
        let err = manager
            .access(&shared.share_id, "stranger", AccessAction::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, SharingError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn update_bumps_version_and_resyncs() {
        let manager = manager();
        let shared = manager
            .share(record(), "owner", vec!["agent-a".to_string()], Permissions::default())
            .await;
        let updated = manager
            .update(&shared.share_id, |record| record.content = "new content".to_string())
            .await
            .unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn respond_approved_merges_requested_permissions() {
        let manager = manager();
        let shared = manager
            .share(record(), "owner", vec![], Permissions::default())
            .await;
        let mut requested = Permissions::default();
        requested.write.insert("agent-b".to_string());
        let request = manager
            .request_access(&shared.share_id, "agent-b", requested, None)
            .await
            .unwrap();
        manager.respond(&request.id, "owner", true, None).await.unwrap();

        let after = manager
            .access(&shared.share_id, "agent-b", AccessAction::Write)
            .await
            .unwrap();
        assert!(after.permissions.write.contains("agent-b"));
    }

    #[tokio::test]
    async fn force_sync_aligns_every_replica_to_the_current_version_and_checksum() {
        let manager = manager();
        let shared = manager
            .share(record(), "owner", vec!["agent-a".to_string()], Permissions::default())
            .await;
        let synced = manager.force_sync(&shared.share_id).await.unwrap();
        assert_eq!(synced.sync_status, SyncStatus::Synced);
        for replica in &synced.replicas {
            assert_eq!(replica.version, synced.version);
            assert_eq!(replica.checksum, synced.checksum);
            assert_eq!(replica.status, agentmem_model::ReplicaStatus::Active);
        }
    }

    #[tokio::test]
    async fn get_stats_aggregates_shares_replicas_and_pending_requests() {
        let manager = manager();
        let shared = manager
            .share(record(), "owner", vec!["agent-a".to_string(), "agent-b".to_string()], Permissions::default())
            .await;
        manager
            .request_access(&shared.share_id, "agent-c", Permissions::default(), None)
            .await
            .unwrap();

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_shares, 1);
        assert_eq!(stats.total_replicas, 2);
        assert_eq!(stats.unreachable_replicas, 0);
        assert_eq!(stats.total_pending_requests, 1);
    }
}
