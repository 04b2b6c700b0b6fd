use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Nine conflict types (spec.md §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    DataConflict,
    VersionConflict,
    PermissionConflict,
    TimestampConflict,
    StructureConflict,
    SemanticConflict,
    ResourceConflict,
    DependencyConflict,
    ConsistencyConflict,
}

impl ConflictType {
    /// Base priority score contribution (spec.md §4.11).
    pub fn base_score(&self) -> u32 {
        match self {
            ConflictType::DataConflict => 3,
            ConflictType::VersionConflict => 2,
            ConflictType::PermissionConflict => 4,
            ConflictType::TimestampConflict => 1,
            ConflictType::StructureConflict => 4,
            ConflictType::SemanticConflict => 3,
            ConflictType::ResourceConflict => 4,
            ConflictType::DependencyConflict => 3,
            ConflictType::ConsistencyConflict => 4,
        }
    }

    /// Default strategy when no rule/pattern/ML recommendation applies
    /// (spec.md §4.11).
    pub fn default_strategy(&self) -> ResolutionStrategy {
        match self {
            ConflictType::DataConflict => ResolutionStrategy::Merge,
            ConflictType::VersionConflict => ResolutionStrategy::Temporal,
            ConflictType::PermissionConflict => ResolutionStrategy::Consensus,
            ConflictType::TimestampConflict => ResolutionStrategy::Temporal,
            ConflictType::StructureConflict => ResolutionStrategy::RuleBased,
            ConflictType::SemanticConflict => ResolutionStrategy::MlGuided,
            ConflictType::ResourceConflict => ResolutionStrategy::Priority,
            ConflictType::DependencyConflict => ResolutionStrategy::RuleBased,
            ConflictType::ConsistencyConflict => ResolutionStrategy::Automatic,
        }
    }
}

/// Seven lifecycle statuses (spec.md §3 Lifecycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Detected,
    Analysing,
    Resolving,
    PendingApproval,
    Resolved,
    Escalated,
    Abandoned,
}

/// Five priority buckets (spec.md §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPriority {
    Low,
    Medium,
    High,
    Critical,
    Emergency,
}

impl ConflictPriority {
    /// Bucketise a raw score (spec.md §4.11: ≥8 emergency, ≥6 critical,
    /// ≥4 high, ≥2 medium, else low).
    pub fn from_score(score: f32) -> Self {
        if score >= 8.0 {
            ConflictPriority::Emergency
        } else if score >= 6.0 {
            ConflictPriority::Critical
        } else if score >= 4.0 {
            ConflictPriority::High
        } else if score >= 2.0 {
            ConflictPriority::Medium
        } else {
            ConflictPriority::Low
        }
    }
}

/// Nine resolution strategies (spec.md §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    Automatic,
    RuleBased,
    MlGuided,
    Consensus,
    Priority,
    Merge,
    Temporal,
    Manual,
    Hybrid,
}

/// One agent's version of the disputed item (spec.md §3). `metadata` carries
/// per-entry attributes such as the permission grants this agent believes
/// apply; divergence there (not in `data` itself) is what `detection`
/// classifies as a `permission_conflict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictingData {
    pub agent_id: String,
    pub data: Value,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub checksum: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictMetadata {
    pub severity: Option<String>,
    pub complexity: Option<String>,
    pub impact_radius: Option<u32>,
    pub frequency_pattern: Option<String>,
    pub tags: Vec<String>,
    pub context: HashMap<String, Value>,
    pub critical: bool,
}

/// Outcome of applying a [`ResolutionStrategy`] (spec.md §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_data: Value,
    pub confidence: f32,
    pub reasoning: String,
    pub involved_strategies: Vec<ResolutionStrategy>,
}

/// A single approver's response (spec.md §4.11 Approval).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub agent_id: String,
    pub approved: bool,
    pub reason: Option<String>,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub required: bool,
    pub approvers: Vec<String>,
    pub responses: Vec<ApprovalResponse>,
    pub threshold: f32,
}

impl Approval {
    /// Fraction of approvers who responded `approved = true`.
    pub fn approved_fraction(&self) -> f32 {
        if self.approvers.is_empty() {
            return 0.0;
        }
        let approved = self.responses.iter().filter(|r| r.approved).count();
        approved as f32 / self.approvers.len() as f32
    }

    pub fn all_responded(&self) -> bool {
        self.responses.len() >= self.approvers.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub id: String,
    pub tenant_id: String,
    pub conflict_type: ConflictType,
    pub status: ConflictStatus,
    pub priority: ConflictPriority,
    pub involved_agents: Vec<String>,
    pub conflicting_data: Vec<ConflictingData>,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<Resolution>,
    pub strategy: Option<ResolutionStrategy>,
    pub approval: Option<Approval>,
    pub metadata: ConflictMetadata,
}

impl Conflict {
    pub fn new(
        tenant_id: impl Into<String>,
        conflict_type: ConflictType,
        involved_agents: Vec<String>,
        conflicting_data: Vec<ConflictingData>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            conflict_type,
            status: ConflictStatus::Detected,
            priority: ConflictPriority::Low,
            involved_agents,
            conflicting_data,
            detected_at: now,
            resolved_at: None,
            resolution: None,
            strategy: None,
            approval: None,
            metadata: ConflictMetadata::default(),
        }
    }
}
