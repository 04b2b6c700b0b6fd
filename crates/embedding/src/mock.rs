use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::{deterministic_embedding, EmbeddingError, EmbeddingProvider, EmbeddingResult};

/// Test-only provider for capability tier `mock` (spec.md §4.7):
/// deterministic vectors plus configurable artificial latency and failure
/// rate, so tier-fallback and retry logic can be exercised without a real
/// backend.
#[derive(Debug)]
pub struct MockEmbeddingProvider {
    dimension: usize,
    latency: Duration,
    failure_rate: f32,
    calls: AtomicU64,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize, latency: Duration, failure_rate: f32) -> Self {
        Self {
            dimension,
            latency,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            calls: AtomicU64::new(0),
        }
    }

    /// splitmix64-style mix so failures are reproducible across runs for a
    /// given call count without pulling in an RNG crate.
    fn pseudo_random_unit(seed: u64) -> f32 {
        let mut z = seed.wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^= z >> 31;
        (z % 1_000_000) as f32 / 1_000_000.0
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(384, Duration::from_millis(0), 0.0)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult, EmbeddingError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if Self::pseudo_random_unit(call) < self.failure_rate {
            return Err(EmbeddingError::ProviderFailure(
                "mock embedding provider simulated failure".to_string(),
            ));
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::EmptyContent);
        }

        Ok(EmbeddingResult {
            vector: deterministic_embedding(trimmed, self.dimension),
            model: "mock-embed".to_string(),
            dimension: self.dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_failure_rate_always_succeeds() {
        let provider = MockEmbeddingProvider::new(16, Duration::from_millis(0), 0.0);
        for _ in 0..20 {
            assert!(provider.embed("hi").await.is_ok());
        }
    }

    #[tokio::test]
    async fn full_failure_rate_always_fails() {
        let provider = MockEmbeddingProvider::new(16, Duration::from_millis(0), 1.0);
        assert!(provider.embed("hi").await.is_err());
    }
}
