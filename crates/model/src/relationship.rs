use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Edge type for a [`Relationship`] (spec.md §3). `parent`/`child` and
/// `sibling` are created in symmetric pairs by the relationship manager;
/// the rest are free-standing single edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Parent,
    Child,
    Sibling,
    References,
    Conflicts,
    Supports,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Parent => "parent",
            RelationshipType::Child => "child",
            RelationshipType::Sibling => "sibling",
            RelationshipType::References => "references",
            RelationshipType::Conflicts => "conflicts",
            RelationshipType::Supports => "supports",
        }
    }
}

/// A directed, typed edge between two memories scoped to a tenant (spec.md
/// §3). Relationships form a directed multigraph per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub tenant_id: String,
    pub source_memory_id: String,
    pub target_memory_id: String,
    pub relationship_type: RelationshipType,
    pub strength: f32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(
        tenant_id: impl Into<String>,
        source_memory_id: impl Into<String>,
        target_memory_id: impl Into<String>,
        relationship_type: RelationshipType,
        strength: f32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            source_memory_id: source_memory_id.into(),
            target_memory_id: target_memory_id.into(),
            relationship_type,
            strength: strength.clamp(0.0, 1.0),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
