//! Detection, prioritisation, strategy dispatch, approval workflow, and
//! metrics for cross-agent conflicts (spec.md §4.11).

pub mod approval;
pub mod detection;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod query;
pub mod queue;
pub mod rules;
pub mod scoring;
pub mod strategies;

pub use error::ConflictError;
pub use manager::{ConflictResolver, ConflictResolverConfig};
pub use metrics::{ConflictMetrics, StrategyTally};
pub use query::ConflictQuery;
pub use queue::run_resolution_loop;
pub use rules::ConflictRule;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;

    use agentmem_model::{ConflictMetadata, ConflictPriority, ConflictStatus, ConflictingData};

    use super::*;

    fn entry(agent: &str, version: u64, offset_secs: i64, value: serde_json::Value) -> ConflictingData {
        ConflictingData {
            agent_id: agent.to_string(),
            data: value,
            version,
            timestamp: Utc::now() + chrono::Duration::seconds(offset_secs),
            confidence: 0.8,
            checksum: format!("{agent}-{version}"),
            metadata: Default::default(),
        }
    }

    /// S5 from spec.md §8: two entries with the same version, >60s apart,
    /// identical structure but different content resolve via `temporal`
    /// (the timestamp_conflict default) and return the later entry.
    #[tokio::test]
    async fn temporal_default_resolves_timestamp_conflict() {
        let resolver = ConflictResolver::new(ConflictResolverConfig::default());
        let data = vec![
            entry("a", 1, -1600, json!({"value": "first"})),
            entry("b", 1, -1000, json!({"value": "second"})),
        ];
        let conflict = resolver
            .detect("tenant-1", data, ConflictMetadata::default())
            .await
            .unwrap()
            .expect("entries disagree");
        assert_eq!(conflict.conflict_type, agentmem_model::ConflictType::TimestampConflict);

        let resolved = resolver.resolve(&conflict.id).await.unwrap();
        assert_eq!(resolved.status, ConflictStatus::Resolved);
        assert_eq!(resolved.resolution.unwrap().resolved_data, json!({"value": "second"}));
    }

    #[tokio::test]
    async fn identical_checksums_detect_no_conflict() {
        let resolver = ConflictResolver::new(ConflictResolverConfig::default());
        let mut a = entry("a", 1, 0, json!({"value": 1}));
        let mut b = entry("b", 1, 0, json!({"value": 1}));
        a.checksum = "same".to_string();
        b.checksum = "same".to_string();
        let result = resolver.detect("tenant-1", vec![a, b], ConflictMetadata::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn critical_conflict_requires_approvers_before_resolving() {
        let resolver = ConflictResolver::new(ConflictResolverConfig::default());
        let data = vec![
            entry("a", 1, 0, json!({"perm": "read"})),
            entry("b", 2, 0, json!({"perm": "write"})),
        ];
        let metadata = ConflictMetadata {
            critical: true,
            ..Default::default()
        };
        let conflict = resolver.detect("tenant-1", data, metadata).await.unwrap().unwrap();
        assert!(conflict.priority >= ConflictPriority::Critical);

        let err = resolver.resolve(&conflict.id).await.unwrap_err();
        assert!(matches!(err, ConflictError::ApproversRequired(_)));

        resolver
            .request_approval(&conflict.id, vec!["owner".to_string()], Some(0.5))
            .await
            .unwrap();
        let approved = resolver.approve(&conflict.id, "owner", true, None).await.unwrap();
        assert_eq!(approved.status, ConflictStatus::Resolved);
    }

    #[tokio::test]
    async fn all_approvers_below_threshold_escalates() {
        let resolver = ConflictResolver::new(ConflictResolverConfig::default());
        let data = vec![
            entry("a", 1, 0, json!({"perm": "read"})),
            entry("b", 2, 0, json!({"perm": "write"})),
        ];
        let conflict = resolver
            .detect("tenant-1", data, ConflictMetadata { critical: true, ..Default::default() })
            .await
            .unwrap()
            .unwrap();
        resolver
            .request_approval(&conflict.id, vec!["a".to_string(), "b".to_string()], Some(0.9))
            .await
            .unwrap();
        resolver.approve(&conflict.id, "a", true, None).await.unwrap();
        let after = resolver.approve(&conflict.id, "b", false, None).await.unwrap();
        assert_eq!(after.status, ConflictStatus::Escalated);
    }

    #[tokio::test]
    async fn rule_action_is_applied_over_the_default_strategy() {
        let resolver = ConflictResolver::new(ConflictResolverConfig::default());
        resolver
            .add_rule(ConflictRule {
                id: "always-manual".to_string(),
                conflict_type: agentmem_model::ConflictType::DataConflict,
                priority: 10,
                enabled: true,
                action: Box::new(|_entries| agentmem_model::Resolution {
                    resolved_data: json!({"ruled": true}),
                    confidence: 1.0,
                    reasoning: "rule override".to_string(),
                    involved_strategies: vec![agentmem_model::ResolutionStrategy::RuleBased],
                }),
            })
            .await;

        let data = vec![
            entry("a", 1, 0, json!({"value": 1})),
            entry("b", 1, 0, json!({"value": 2})),
        ];
        let conflict = resolver.detect("tenant-1", data, ConflictMetadata::default()).await.unwrap().unwrap();
        let resolved = resolver.resolve(&conflict.id).await.unwrap();
        assert_eq!(resolved.resolution.unwrap().resolved_data, json!({"ruled": true}));
    }

    #[tokio::test]
    async fn stats_track_detected_and_resolved_totals() {
        let resolver = Arc::new(ConflictResolver::new(ConflictResolverConfig::default()));
        let data = vec![
            entry("a", 1, 0, json!({"value": 1})),
            entry("b", 1, 0, json!({"value": 2})),
        ];
        let conflict = resolver.detect("tenant-1", data, ConflictMetadata::default()).await.unwrap().unwrap();
        resolver.resolve(&conflict.id).await.unwrap();
        let stats = resolver.stats().await;
        assert_eq!(stats.total_detected, 1);
        assert_eq!(stats.total_resolved, 1);
    }
}
