use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use agentmem_model::MemoryType;

/// Caller-supplied overrides for `remember` (spec.md §4.6). Fields left
/// `None`/empty fall back to the classifier/scorer or record defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RememberOptions {
    pub memory_type: Option<MemoryType>,
    pub importance: Option<f32>,
    pub emotional_weight: Option<f32>,
    pub tags: BTreeSet<String>,
    pub context: Map<String, Value>,
    pub ttl: Option<DateTime<Utc>>,
}

/// Caller-supplied overrides for `recall` (spec.md §4.3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallOptions {
    pub memory_type: Option<MemoryType>,
    pub limit: usize,
    pub threshold: f32,
    pub include_context: bool,
    pub time_decay: bool,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            memory_type: None,
            limit: 10,
            threshold: 0.7,
            include_context: false,
            time_decay: false,
        }
    }
}

/// Request carried into `context` (spec.md §4.6). When `topic` is present
/// the engine delegates to `recall` with threshold 0.6; otherwise it runs a
/// generic-query search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRequest {
    pub tenant_id: String,
    pub agent_id: Option<String>,
    pub topic: Option<String>,
    pub memory_types: Option<Vec<MemoryType>>,
    pub limit: usize,
}

impl ContextRequest {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            agent_id: None,
            topic: None,
            memory_types: None,
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    pub memories: Vec<agentmem_model::MemoryRecord>,
    pub total_count: usize,
    pub context_summary: String,
    pub confidence: f32,
    pub generated_at: DateTime<Utc>,
}

/// Deterministic enumeration: "N memories: C1 type1s, C2 type2s, …"
/// (spec.md §4.6).
pub fn summarize(memories: &[agentmem_model::MemoryRecord]) -> String {
    if memories.is_empty() {
        return "0 memories".to_string();
    }
    let mut counts: Vec<(MemoryType, usize)> = Vec::new();
    for memory in memories {
        if let Some(entry) = counts.iter_mut().find(|(t, _)| *t == memory.memory_type) {
            entry.1 += 1;
        } else {
            counts.push((memory.memory_type, 1));
        }
    }
    let parts: Vec<String> = counts
        .iter()
        .map(|(memory_type, count)| format!("{count} {}s", memory_type.as_str()))
        .collect();
    format!("{} memories: {}", memories.len(), parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmem_model::MemoryRecord;

    fn record(memory_type: MemoryType) -> MemoryRecord {
        MemoryRecord::new("t", None, memory_type, "x", 0.5, Utc::now()).unwrap()
    }

    #[test]
    fn summarize_empty_set() {
        assert_eq!(summarize(&[]), "0 memories");
    }

    #[test]
    fn summarize_counts_by_type_in_first_seen_order() {
        let memories = vec![
            record(MemoryType::Fact),
            record(MemoryType::Fact),
            record(MemoryType::Preference),
        ];
        assert_eq!(summarize(&memories), "3 memories: 2 facts, 1 preferences");
    }
}
