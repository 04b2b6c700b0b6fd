use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};

use agentmem_model::{
    Approval, Conflict, ConflictPriority, ConflictStatus, ConflictType, ConflictingData,
    Resolution, ResolutionStrategy,
};

use crate::error::ConflictError;
use crate::metrics::ConflictMetrics;
use crate::query::ConflictQuery;
use crate::rules::{best_matching_rule, ConflictRule};
use crate::{detection, scoring, strategies};

type SemanticClassifier = dyn Fn(&ConflictingData, &ConflictingData) -> bool + Send + Sync;
type MlRecommender = dyn Fn(&[ConflictingData]) -> ResolutionStrategy + Send + Sync;

/// Tunables that don't belong in `agentmem-config`'s five validated
/// sections (spec.md §4.11): per-agent priority ranking, additive merge
/// fields, and the priority bucket at which approval becomes mandatory.
pub struct ConflictResolverConfig {
    pub approval_priority_threshold: ConflictPriority,
    pub default_approval_threshold: f32,
    pub agent_ranking: HashMap<String, i32>,
    pub additive_merge_fields: Vec<String>,
    pub semantic_classifier: Option<Arc<SemanticClassifier>>,
    pub ml_recommender: Option<Arc<MlRecommender>>,
    pub auto_resolve_queue: Option<mpsc::Sender<String>>,
}

impl Default for ConflictResolverConfig {
    fn default() -> Self {
        Self {
            approval_priority_threshold: ConflictPriority::Critical,
            default_approval_threshold: 0.5,
            agent_ranking: HashMap::new(),
            additive_merge_fields: vec!["tags".to_string()],
            semantic_classifier: None,
            ml_recommender: None,
            auto_resolve_queue: None,
        }
    }
}

/// Orchestrates detection, prioritisation, strategy dispatch, the approval
/// workflow, and metrics (spec.md §4.11). Conflicts and rules are held
/// behind `tokio::sync::RwLock` rather than a single global mutex so reads
/// (`get`/`query`/`stats`) never block each other.
pub struct ConflictResolver {
    config: ConflictResolverConfig,
    conflicts: RwLock<HashMap<String, Conflict>>,
    rules: RwLock<Vec<ConflictRule>>,
    metrics: RwLock<ConflictMetrics>,
    /// Last strategy that successfully resolved a conflict of this type —
    /// the "pattern match over historical signatures" fallback (spec.md
    /// §4.11 strategy selection, third tier).
    learned_patterns: RwLock<HashMap<ConflictType, ResolutionStrategy>>,
}

impl ConflictResolver {
    pub fn new(config: ConflictResolverConfig) -> Self {
        Self {
            config,
            conflicts: RwLock::new(HashMap::new()),
            rules: RwLock::new(Vec::new()),
            metrics: RwLock::new(ConflictMetrics::default()),
            learned_patterns: RwLock::new(HashMap::new()),
        }
    }

    /// Classifies the divergence among `data` (spec.md §4.11 Detection: the
    /// first two entries establish the conflict type; later entries only
    /// widen `involved_agents`/`conflicting_data`), scores and bucketises
    /// its priority, and registers it. Returns `Ok(None)` when the entries
    /// do not actually disagree (identical checksums pairwise).
    pub async fn detect(
        &self,
        tenant_id: impl Into<String>,
        data: Vec<ConflictingData>,
        metadata: agentmem_model::ConflictMetadata,
    ) -> Result<Option<Conflict>, ConflictError> {
        if data.len() < 2 {
            return Ok(None);
        }
        let classifier = self.config.semantic_classifier.as_deref();
        let conflict_type = match detection::detect(&data[0], &data[1], classifier) {
            Some(t) => t,
            None => return Ok(None),
        };

        let confidence_diff = (data[0].confidence - data[1].confidence).abs();
        let age_diff = chrono::Duration::seconds((data[0].timestamp - data[1].timestamp).num_seconds().abs());
        let score = scoring::priority_score(conflict_type, confidence_diff, age_diff, metadata.critical);
        let priority = scoring::bucketise(score);

        let involved_agents: Vec<String> = data.iter().map(|d| d.agent_id.clone()).collect();
        let mut conflict = Conflict::new(tenant_id, conflict_type, involved_agents.clone(), data, Utc::now());
        conflict.priority = priority;
        conflict.metadata = metadata;

        self.metrics.write().await.record_detected(conflict_type, &involved_agents);

        let id = conflict.id.clone();
        self.conflicts.write().await.insert(id, conflict.clone());

        if priority >= self.config.approval_priority_threshold {
            // Leave status = Detected; `resolve` will reject until
            // `request_approval` supplies approvers (spec.md §9 Open
            // Question).
        } else if let Some(sender) = &self.config.auto_resolve_queue {
            let _ = sender.send(conflict.id.clone()).await;
        }

        Ok(Some(conflict))
    }

    /// Appends another agent's version to an already-detected conflict
    /// (spec.md §6: `add_conflicting_data`).
    pub async fn add_conflicting_data(
        &self,
        conflict_id: &str,
        entry: ConflictingData,
    ) -> Result<Conflict, ConflictError> {
        let mut conflicts = self.conflicts.write().await;
        let conflict = conflicts
            .get_mut(conflict_id)
            .ok_or_else(|| ConflictError::NotFound(conflict_id.to_string()))?;
        if !conflict.involved_agents.iter().any(|a| a == &entry.agent_id) {
            conflict.involved_agents.push(entry.agent_id.clone());
        }
        conflict.conflicting_data.push(entry);
        Ok(conflict.clone())
    }

    /// Attaches an approval gate to a detected conflict. Required before
    /// `resolve` will proceed once priority forces approval (spec.md §9
    /// Open Question: approvers are a required input, never inferred).
    pub async fn request_approval(
        &self,
        conflict_id: &str,
        approvers: Vec<String>,
        threshold: Option<f32>,
    ) -> Result<Conflict, ConflictError> {
        let mut conflicts = self.conflicts.write().await;
        let conflict = conflicts
            .get_mut(conflict_id)
            .ok_or_else(|| ConflictError::NotFound(conflict_id.to_string()))?;
        conflict.approval = Some(Approval {
            required: true,
            approvers,
            responses: Vec::new(),
            threshold: threshold.unwrap_or(self.config.default_approval_threshold),
        });
        conflict.status = ConflictStatus::PendingApproval;
        Ok(conflict.clone())
    }

    /// Picks a strategy for `conflict` in priority order: enabled rule
    /// matching its type, then the last strategy that previously resolved
    /// this type successfully ("pattern match"), then an ML recommender,
    /// then the type's documented default (spec.md §4.11 Strategy
    /// selection). A matching rule's `action` is applied directly; callers
    /// get back a resolution rather than needing to re-dispatch on
    /// `RuleBased`.
    async fn select_resolution(&self, conflict: &Conflict) -> (ResolutionStrategy, Resolution) {
        let rules = self.rules.read().await;
        if let Some(rule) = best_matching_rule(&rules, conflict.conflict_type) {
            let mut resolution = (rule.action)(&conflict.conflicting_data);
            if resolution.involved_strategies.is_empty() {
                resolution.involved_strategies.push(ResolutionStrategy::RuleBased);
            }
            return (ResolutionStrategy::RuleBased, resolution);
        }
        drop(rules);

        if let Some(strategy) = self.learned_patterns.read().await.get(&conflict.conflict_type).copied() {
            self.metrics.write().await.record_pattern_match();
            return (strategy, self.apply_strategy(strategy, conflict));
        }

        if let Some(recommender) = &self.config.ml_recommender {
            let strategy = recommender(&conflict.conflicting_data);
            return (strategy, self.apply_strategy(strategy, conflict));
        }

        let strategy = conflict.conflict_type.default_strategy();
        (strategy, self.apply_strategy(strategy, conflict))
    }

    /// Applies a named strategy's pure function over `conflict`'s entries
    /// (spec.md §4.11 Strategies). `Manual` has no caller payload here and
    /// is only reachable through `resolve_manual`; reaching it via the
    /// default/pattern/ML path falls back to `Automatic`.
    fn apply_strategy(&self, strategy: ResolutionStrategy, conflict: &Conflict) -> Resolution {
        let entries = &conflict.conflicting_data;
        match strategy {
            ResolutionStrategy::Automatic => strategies::automatic(entries),
            ResolutionStrategy::RuleBased => strategies::automatic(entries),
            ResolutionStrategy::MlGuided => match &self.config.ml_recommender {
                Some(recommender) => {
                    let recommended = recommender(entries);
                    strategies::ml_guided(entries, recommended, &self.config.agent_ranking, &self.config.additive_merge_fields)
                }
                None => strategies::automatic(entries),
            },
            ResolutionStrategy::Consensus => strategies::consensus(entries),
            ResolutionStrategy::Priority => strategies::priority(entries, &self.config.agent_ranking),
            ResolutionStrategy::Merge => strategies::merge(entries, &self.config.additive_merge_fields),
            ResolutionStrategy::Temporal => strategies::temporal(entries),
            ResolutionStrategy::Manual => strategies::manual(serde_json::Value::Null),
            ResolutionStrategy::Hybrid => {
                let rule_based = self
                    .rules
                    .try_read()
                    .ok()
                    .and_then(|rules| best_matching_rule(&rules, conflict.conflict_type).map(|r| (r.action)(entries)));
                strategies::hybrid(entries, rule_based)
            }
        }
    }

    /// Resolves `conflict_id`, gated by the approval workflow when its
    /// priority requires it. Returns the conflict's post-resolution state:
    /// `Resolved` when applied immediately, `PendingApproval` when waiting
    /// on `approve` calls, or an error if approval is mandatory but no
    /// approvers were ever requested (spec.md §9 Open Question).
    pub async fn resolve(&self, conflict_id: &str) -> Result<Conflict, ConflictError> {
        let snapshot = {
            let conflicts = self.conflicts.read().await;
            conflicts
                .get(conflict_id)
                .cloned()
                .ok_or_else(|| ConflictError::NotFound(conflict_id.to_string()))?
        };
        if snapshot.status == ConflictStatus::Resolved {
            return Err(ConflictError::AlreadyResolved(conflict_id.to_string()));
        }

        let requires_approval = snapshot.priority >= self.config.approval_priority_threshold;
        if requires_approval {
            match &snapshot.approval {
                None => return Err(ConflictError::ApproversRequired(conflict_id.to_string())),
                Some(approval) if approval.approved_fraction() < approval.threshold => {
                    let mut conflicts = self.conflicts.write().await;
                    let conflict = conflicts.get_mut(conflict_id).expect("checked above");
                    conflict.status = ConflictStatus::PendingApproval;
                    return Ok(conflict.clone());
                }
                Some(_) => {}
            }
        }

        let (strategy, resolution) = self.select_resolution(&snapshot).await;
        self.apply_resolution(conflict_id, strategy, resolution).await
    }

    /// Resolves `conflict_id` with a caller-supplied payload (spec.md
    /// §4.11 `manual`: "caller supplies payload; confidence = 1").
    pub async fn resolve_manual(
        &self,
        conflict_id: &str,
        payload: serde_json::Value,
    ) -> Result<Conflict, ConflictError> {
        {
            let conflicts = self.conflicts.read().await;
            let conflict = conflicts
                .get(conflict_id)
                .ok_or_else(|| ConflictError::NotFound(conflict_id.to_string()))?;
            if conflict.status == ConflictStatus::Resolved {
                return Err(ConflictError::AlreadyResolved(conflict_id.to_string()));
            }
        }
        let resolution = strategies::manual(payload);
        self.apply_resolution(conflict_id, ResolutionStrategy::Manual, resolution).await
    }

    async fn apply_resolution(
        &self,
        conflict_id: &str,
        strategy: ResolutionStrategy,
        resolution: Resolution,
    ) -> Result<Conflict, ConflictError> {
        let mut conflicts = self.conflicts.write().await;
        let conflict = conflicts
            .get_mut(conflict_id)
            .ok_or_else(|| ConflictError::NotFound(conflict_id.to_string()))?;
        conflict.strategy = Some(strategy);
        conflict.resolution = Some(resolution);
        conflict.status = ConflictStatus::Resolved;
        conflict.resolved_at = Some(Utc::now());
        let conflict_type = conflict.conflict_type;
        let result = conflict.clone();
        drop(conflicts);

        self.learned_patterns.write().await.insert(conflict_type, strategy);
        self.metrics.write().await.record_resolution(strategy, true);
        Ok(result)
    }

    /// Transitions a conflict to `escalated` without resolving it (called
    /// by the auto-resolution loop on repeated failure, and when every
    /// approver has responded below threshold).
    pub async fn escalate(&self, conflict_id: &str) -> Result<Conflict, ConflictError> {
        let mut conflicts = self.conflicts.write().await;
        let conflict = conflicts
            .get_mut(conflict_id)
            .ok_or_else(|| ConflictError::NotFound(conflict_id.to_string()))?;
        conflict.status = ConflictStatus::Escalated;
        let result = conflict.clone();
        drop(conflicts);
        self.metrics.write().await.record_escalated();
        Ok(result)
    }

    /// Records one approver's response. When the approved-fraction reaches
    /// the approval's threshold, applies the previously-selected
    /// resolution and transitions to resolved; when every approver has
    /// responded below threshold, transitions to escalated (spec.md
    /// §4.11 Approval).
    pub async fn approve(
        &self,
        conflict_id: &str,
        agent_id: &str,
        approved: bool,
        reason: Option<String>,
    ) -> Result<Conflict, ConflictError> {
        let (reached, escalated_now, snapshot) = {
            let mut conflicts = self.conflicts.write().await;
            let conflict = conflicts
                .get_mut(conflict_id)
                .ok_or_else(|| ConflictError::NotFound(conflict_id.to_string()))?;
            let approval = conflict
                .approval
                .as_mut()
                .ok_or_else(|| ConflictError::NoApprovalPending(conflict_id.to_string()))?;
            let reached = crate::approval::record_response(approval, agent_id, approved, reason)?;
            let escalated_now = !reached && crate::approval::should_escalate(approval);
            if escalated_now {
                conflict.status = ConflictStatus::Escalated;
            }
            (reached, escalated_now, conflict.clone())
        };

        if reached {
            return self.resolve(conflict_id).await;
        }
        if escalated_now {
            self.metrics.write().await.record_escalated();
        }
        Ok(snapshot)
    }

    pub async fn get(&self, conflict_id: &str) -> Option<Conflict> {
        self.conflicts.read().await.get(conflict_id).cloned()
    }

    pub async fn query(&self, query: &ConflictQuery) -> Vec<Conflict> {
        self.conflicts
            .read()
            .await
            .values()
            .filter(|c| query.matches(c))
            .cloned()
            .collect()
    }

    pub async fn add_rule(&self, rule: ConflictRule) {
        self.rules.write().await.push(rule);
    }

    pub async fn update_rule(&self, rule_id: &str, enabled: bool) -> Result<(), ConflictError> {
        let mut rules = self.rules.write().await;
        let rule = rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| ConflictError::RuleNotFound(rule_id.to_string()))?;
        rule.enabled = enabled;
        Ok(())
    }

    pub async fn stats(&self) -> ConflictMetrics {
        self.metrics.read().await.clone()
    }
}
