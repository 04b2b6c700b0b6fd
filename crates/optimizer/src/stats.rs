use serde::{Deserialize, Serialize};

/// Per-tenant statistics surfaced by `optimize()` (spec.md §4.8).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memories: usize,
    pub total_size_bytes: u64,
    pub duplicates: usize,
    pub old_memories: usize,
    pub low_access_memories: usize,
    pub compression_ratio: f32,
}

/// `content.length*2 + embedding.length*4 + metadata_json.length*2`
/// (spec.md §4.8).
pub fn estimate_size_bytes(record: &agentmem_model::MemoryRecord) -> u64 {
    let content_bytes = record.content.len() as u64 * 2;
    let embedding_bytes = record
        .embedding
        .as_ref()
        .map(|e| e.len() as u64 * 4)
        .unwrap_or(0);
    let metadata_bytes = serde_json::to_string(&record.context)
        .map(|s| s.len() as u64 * 2)
        .unwrap_or(0);
    content_bytes + embedding_bytes + metadata_bytes
}
