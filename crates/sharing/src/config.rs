use std::time::Duration;

/// How aggressively updates propagate to replicas (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationStrategy {
    Immediate,
    Lazy,
    OnDemand,
    Smart,
}

#[derive(Debug, Clone)]
pub struct SharingConfig {
    pub max_replicas: usize,
    pub access_cache_ttl: Duration,
    pub replication_strategy: ReplicationStrategy,
    /// Window used by the relevance formula's recency term (spec.md §4.10).
    pub relevance_max_age_days: i64,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            max_replicas: 8,
            access_cache_ttl: Duration::from_secs(60),
            replication_strategy: ReplicationStrategy::Immediate,
            relevance_max_age_days: 30,
        }
    }
}
