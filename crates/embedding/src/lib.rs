//! Embedding Service (spec.md §4.4): turns free text into a fixed-dimension
//! vector. Three providers back the capability tiers in §4.7 — remote,
//! local, and a deterministic mock for tests.

pub mod error;
pub mod local;
pub mod mock;
pub mod remote;

pub use error::EmbeddingError;
pub use local::LocalEmbeddingProvider;
pub use mock::MockEmbeddingProvider;
pub use remote::RemoteEmbeddingProvider;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub vector: Vec<f32>,
    pub model: String,
    pub dimension: usize,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult, EmbeddingError>;
}

/// Deterministic hash-to-unit-vector scheme shared by the local and mock
/// providers: every byte of a SHA-256 digest of `text` (re-hashed with a
/// counter until `dimension` floats are produced) seeds one component, then
/// the vector is L2-normalised so cosine similarity behaves sanely.
pub fn deterministic_embedding(text: &str, dimension: usize) -> Vec<f32> {
    use sha2::{Digest, Sha256};

    let mut vector = Vec::with_capacity(dimension);
    let mut counter: u32 = 0;
    while vector.len() < dimension {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(counter.to_le_bytes());
        let digest = hasher.finalize();
        for chunk in digest.chunks(4) {
            if vector.len() >= dimension {
                break;
            }
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            let raw = u32::from_le_bytes(bytes) as f32;
            vector.push(raw / u32::MAX as f32 - 0.5);
        }
        counter += 1;
    }

    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for component in &mut vector {
            *component /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_embedding_is_stable_and_normalised() {
        let a = deterministic_embedding("hello world", 32);
        let b = deterministic_embedding("hello world", 32);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    fn deterministic_embedding_differs_for_different_text() {
        let a = deterministic_embedding("hello", 16);
        let b = deterministic_embedding("goodbye", 16);
        assert_ne!(a, b);
    }
}
