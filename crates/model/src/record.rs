use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("content must not be empty after trimming")]
    InvalidContent,
    #[error("tenant_id must not be empty")]
    InvalidTenant,
    #[error("embedding length {got} does not match configured dimension {expected}")]
    EmbeddingDimensionMismatch { expected: usize, got: usize },
}

/// The classifier/schema-level type of a memory. Priority order when
/// classifying free text is documented on `agentmem_classifier::classify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Fact,
    Preference,
    Procedure,
    Task,
    Emotion,
    Personality,
    Thread,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Fact => "fact",
            MemoryType::Preference => "preference",
            MemoryType::Procedure => "procedure",
            MemoryType::Task => "task",
            MemoryType::Emotion => "emotion",
            MemoryType::Personality => "personality",
            MemoryType::Thread => "thread",
        }
    }
}

/// The unit of storage. See `spec.md` §3 for the full invariant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub tenant_id: String,
    pub agent_id: Option<String>,
    pub memory_type: MemoryType,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub confidence: f32,
    pub importance: f32,
    pub emotional_weight: Option<f32>,
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
    pub ttl: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    /// Construct a new record, trimming content and stamping all three
    /// timestamps to `now`. `tenant_id` and trimmed `content` must be
    /// non-empty, matching the invariants in spec.md §3.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: impl Into<String>,
        agent_id: Option<String>,
        memory_type: MemoryType,
        content: impl Into<String>,
        importance: f32,
        now: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        let tenant_id = tenant_id.into();
        if tenant_id.trim().is_empty() {
            return Err(ModelError::InvalidTenant);
        }
        let content = content.into().trim().to_string();
        if content.is_empty() {
            return Err(ModelError::InvalidContent);
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            agent_id,
            memory_type,
            content,
            embedding: None,
            confidence: 1.0,
            importance: importance.clamp(0.0, 1.0),
            emotional_weight: None,
            tags: BTreeSet::new(),
            context: Map::new(),
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl: None,
        })
    }

    /// Validate the embedding dimension against the configured `dimension`,
    /// if an embedding is present.
    pub fn validate_embedding_dimension(&self, dimension: usize) -> Result<(), ModelError> {
        if let Some(embedding) = &self.embedding {
            if embedding.len() != dimension {
                return Err(ModelError::EmbeddingDimensionMismatch {
                    expected: dimension,
                    got: embedding.len(),
                });
            }
        }
        Ok(())
    }

    /// Record a successful recall: bump `access_count` and `last_accessed_at`.
    /// `last_accessed_at` and `updated_at` are monotone-non-decreasing per id.
    pub fn mark_accessed(&mut self, now: DateTime<Utc>) {
        if now > self.last_accessed_at {
            self.last_accessed_at = now;
        }
        self.access_count += 1;
    }

    pub fn apply_patch(&mut self, patch: RecordPatch, now: DateTime<Utc>) {
        if let Some(content) = patch.content {
            self.content = content.trim().to_string();
        }
        if let Some(memory_type) = patch.memory_type {
            self.memory_type = memory_type;
        }
        if let Some(importance) = patch.importance {
            self.importance = importance.clamp(0.0, 1.0);
        }
        if let Some(confidence) = patch.confidence {
            self.confidence = confidence.clamp(0.0, 1.0);
        }
        if let Some(emotional_weight) = patch.emotional_weight {
            self.emotional_weight = Some(emotional_weight.clamp(-1.0, 1.0));
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(context) = patch.context {
            self.context = context;
        }
        if let Some(embedding) = patch.embedding {
            self.embedding = Some(embedding);
        }
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

/// Partial update applied by `update(id, patch)`. Absent fields are left
/// untouched, matching the storage adapter's `update` contract in spec.md §4.2.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPatch {
    pub content: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub importance: Option<f32>,
    pub confidence: Option<f32>,
    pub emotional_weight: Option<f32>,
    pub tags: Option<BTreeSet<String>>,
    pub context: Option<Map<String, Value>>,
    pub embedding: Option<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_content_and_stamps_timestamps() {
        let now = Utc::now();
        let record =
            MemoryRecord::new("tenant-1", None, MemoryType::Fact, "  hello  ", 0.5, now).unwrap();
        assert_eq!(record.content, "hello");
        assert_eq!(record.created_at, now);
        assert_eq!(record.updated_at, now);
        assert_eq!(record.last_accessed_at, now);
        assert_eq!(record.access_count, 0);
    }

    #[test]
    fn new_rejects_empty_content() {
        let now = Utc::now();
        let err = MemoryRecord::new("tenant-1", None, MemoryType::Fact, "   ", 0.5, now)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidContent));
    }

    #[test]
    fn new_rejects_empty_tenant() {
        let now = Utc::now();
        let err = MemoryRecord::new("", None, MemoryType::Fact, "hello", 0.5, now).unwrap_err();
        assert!(matches!(err, ModelError::InvalidTenant));
    }

    #[test]
    fn mark_accessed_increments_and_never_moves_backwards() {
        let now = Utc::now();
        let mut record =
            MemoryRecord::new("tenant-1", None, MemoryType::Fact, "hello", 0.5, now).unwrap();
        let earlier = now - chrono::Duration::days(1);
        record.mark_accessed(earlier);
        assert_eq!(record.access_count, 1);
        assert_eq!(record.last_accessed_at, now, "must not move backwards");
    }
}
