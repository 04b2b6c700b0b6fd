//! Vector Store (spec.md §4.3): embedding index behind a store-agnostic
//! contract, searched with a tenant/agent/type filter, a similarity
//! threshold and an optional result cap.

pub mod error;
pub mod http;
pub mod in_memory;

pub use error::VectorError;
pub use http::HttpVectorStore;
pub use in_memory::InMemoryVectorStore;

use async_trait::async_trait;

use agentmem_model::{MemoryRecord, VectorQuery, VectorResult};

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn initialize(&self) -> Result<(), VectorError>;
    async fn upsert(&self, record: &MemoryRecord, embedding: &[f32]) -> Result<(), VectorError>;
    async fn search(
        &self,
        embedding: &[f32],
        query: &VectorQuery,
    ) -> Result<Vec<VectorResult>, VectorError>;
    async fn delete(&self, ids: &[String]) -> Result<usize, VectorError>;
    async fn count(&self, tenant_id: Option<&str>) -> Result<usize, VectorError>;
    async fn health(&self) -> Result<bool, VectorError>;
    async fn close(&self) -> Result<(), VectorError>;
}

/// Cosine similarity, clamped to `[0.0, 1.0]` (negative cosine is mapped to
/// zero relevance since a memory store never wants "opposite of the query"
/// ranked above "unrelated").
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Ranks candidates by cosine similarity against `query`, keeps the ones
/// passing the threshold, then truncates to `limit` (spec.md §4.3: "if
/// fewer than limit pass the threshold, the shorter result is returned").
pub fn rank_and_limit(
    mut scored: Vec<VectorResult>,
    threshold: f32,
    limit: usize,
) -> Vec<VectorResult> {
    scored.retain(|result| result.score >= threshold);
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    if limit > 0 && scored.len() > limit {
        scored.truncate(limit);
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_mismatched_dimensions_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn rank_and_limit_drops_below_threshold_and_sorts_descending() {
        let dummy = |score: f32| VectorResult {
            record: agentmem_model::MemoryRecord::new(
                "t",
                None,
                agentmem_model::MemoryType::Fact,
                "x",
                0.5,
                chrono::Utc::now(),
            )
            .unwrap(),
            score,
        };
        let scored = vec![dummy(0.95), dummy(0.3), dummy(0.8)];
        let ranked = rank_and_limit(scored, 0.5, 10);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].score > ranked[1].score);
    }
}
