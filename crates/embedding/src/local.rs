use async_trait::async_trait;

use crate::{deterministic_embedding, EmbeddingError, EmbeddingProvider, EmbeddingResult};

/// Stands in for a `candle`-backed local model: no network call, no model
/// weights to load at build time, but deterministic and dimension-stable so
/// the rest of the engine can treat it like a real local inference backend
/// (capability tier `smart`, spec.md §4.7).
#[derive(Debug, Clone)]
pub struct LocalEmbeddingProvider {
    model: String,
    dimension: usize,
}

impl LocalEmbeddingProvider {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
        }
    }
}

impl Default for LocalEmbeddingProvider {
    fn default() -> Self {
        Self::new("local-hash-embed", 384)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::EmptyContent);
        }
        Ok(EmbeddingResult {
            vector: deterministic_embedding(trimmed, self.dimension),
            model: self.model.clone(),
            dimension: self.dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embed_rejects_empty_content() {
        let provider = LocalEmbeddingProvider::default();
        let err = provider.embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::EmptyContent));
    }

    #[tokio::test]
    async fn embed_produces_requested_dimension() {
        let provider = LocalEmbeddingProvider::new("local-hash-embed", 64);
        let result = provider.embed("remember this").await.unwrap();
        assert_eq!(result.vector.len(), 64);
        assert_eq!(result.dimension, 64);
    }
}
