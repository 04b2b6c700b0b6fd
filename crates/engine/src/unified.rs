use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use agentmem_config::AppConfig;
use agentmem_embedding::{EmbeddingProvider, LocalEmbeddingProvider, MockEmbeddingProvider, RemoteEmbeddingProvider};
use agentmem_model::{MemoryRecord, RecordPatch, StorageFilter, VectorResult};
use agentmem_storage::{InMemoryAdapter, StorageAdapter};
use agentmem_vector::{InMemoryVectorStore, VectorStore};

use crate::engine::MemoryEngine;
use crate::error::EngineError;
use crate::health::EngineHealth;
use crate::keyword::KeywordEngine;
use crate::ops::EngineOps;
use crate::options::{ContextRequest, ContextResult, RecallOptions, RememberOptions};
use crate::tier::{Tier, TierDetector};

/// Re-populates a freshly-built vector store from whatever the storage
/// adapter already holds (spec.md §4.2/§4.3: storage is durable, the
/// in-process vector index is not). Only records carrying an embedding of
/// the configured dimension are restored; dimension mismatches are skipped
/// rather than failing the whole rehydration.
async fn rehydrate_vector_store(storage: &dyn StorageAdapter, vector: &dyn VectorStore, dimension: usize) {
    let records = match storage.list(&StorageFilter::default()).await {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(%err, "failed to list storage while rehydrating vector store");
            return;
        }
    };
    for record in records {
        let Some(embedding) = record.embedding.clone() else {
            continue;
        };
        if embedding.len() != dimension {
            continue;
        }
        if let Err(err) = vector.upsert(&record, &embedding).await {
            tracing::warn!(id = %record.id, %err, "failed to rehydrate vector store entry");
        }
    }
}

/// Builds the collaborator set for a given tier, sharing one storage
/// adapter across every tier (spec.md §4.7: tiers differ in embedding +
/// vector capability, not in durability).
async fn build_engine_for_tier(tier: Tier, config: &AppConfig, storage: Arc<dyn StorageAdapter>) -> Box<dyn EngineOps> {
    match tier {
        Tier::Advanced => {
            let embedding: Arc<dyn EmbeddingProvider> = match RemoteEmbeddingProvider::new(
                config
                    .embedding
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434/embed".to_string()),
                config.embedding.model.clone(),
                config.embedding.api_key.clone(),
            ) {
                Ok(provider) => Arc::new(provider),
                Err(_) => Arc::new(MockEmbeddingProvider::default()),
            };
            let vector: Arc<dyn VectorStore> = if config.use_in_memory_vector_store() {
                Arc::new(InMemoryVectorStore::new())
            } else {
                match agentmem_vector::HttpVectorStore::new(
                    config.vector_db.url.clone(),
                    config.vector_db.collection.clone(),
                    config.vector_db.api_key.clone(),
                ) {
                    Ok(store) => Arc::new(store),
                    Err(_) => Arc::new(InMemoryVectorStore::new()),
                }
            };
            rehydrate_vector_store(storage.as_ref(), vector.as_ref(), config.vector_db.dimension).await;
            Box::new(MemoryEngine::new(storage, vector, embedding, config.vector_db.dimension))
        }
        Tier::Smart => {
            let embedding: Arc<dyn EmbeddingProvider> = Arc::new(LocalEmbeddingProvider::new(
                config.embedding.model.clone(),
                config.vector_db.dimension,
            ));
            let vector: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
            rehydrate_vector_store(storage.as_ref(), vector.as_ref(), config.vector_db.dimension).await;
            Box::new(MemoryEngine::new(storage, vector, embedding, config.vector_db.dimension))
        }
        Tier::Basic => Box::new(KeywordEngine::new(storage)),
        Tier::Mock => {
            let embedding: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new(
                config.vector_db.dimension,
                Duration::ZERO,
                0.0,
            ));
            let vector: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
            rehydrate_vector_store(storage.as_ref(), vector.as_ref(), config.vector_db.dimension).await;
            Box::new(MemoryEngine::new(storage, vector, embedding, config.vector_db.dimension))
        }
    }
}

/// Statistics surfaced by `get_stats`/`get_tier_info` (spec.md §4.7, §6).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct EngineStats {
    pub current_tier: Option<String>,
    pub fallback_count: u64,
    pub operation_count: u64,
}

/// Owns a boxed tier implementation and swaps it on fallback (spec.md §4.7,
/// design note §9: "deep inheritance -> capability interfaces"). Every
/// public operation delegates to the active engine; on failure, if the
/// fallback chain is non-empty, it initialises the next tier and retries
/// the same operation exactly once.
pub struct UnifiedEngine {
    config: AppConfig,
    storage: Arc<dyn StorageAdapter>,
    active: RwLock<Box<dyn EngineOps>>,
    current_tier: RwLock<Tier>,
    fallback_chain: RwLock<Vec<Tier>>,
    stats: RwLock<EngineStats>,
}

impl UnifiedEngine {
    /// Detects the preferred tier, initialises it over a fresh
    /// in-process storage adapter, and returns the unified engine ready to
    /// serve operations.
    pub async fn initialize(config: AppConfig) -> Self {
        Self::initialize_with_storage(config, Arc::new(InMemoryAdapter::new())).await
    }

    /// As [`Self::initialize`], but over a caller-supplied storage adapter
    /// (e.g. a `FileAdapter` so state survives process restarts, matching
    /// the CLI's use of the library surface).
    pub async fn initialize_with_storage(config: AppConfig, storage: Arc<dyn StorageAdapter>) -> Self {
        let detector = TierDetector::new();
        let (tier, chain) = detector.detect(&config).await;
        let active = build_engine_for_tier(tier, &config, storage.clone()).await;
        Self {
            config,
            storage,
            active: RwLock::new(active),
            current_tier: RwLock::new(tier),
            fallback_chain: RwLock::new(chain),
            stats: RwLock::new(EngineStats {
                current_tier: Some(tier.as_str().to_string()),
                ..Default::default()
            }),
        }
    }

    /// Re-initialises explicitly at `tier` (spec.md §4.7: `switch_tier`).
    pub async fn switch_tier(&self, tier: Tier) {
        let active = build_engine_for_tier(tier, &self.config, self.storage.clone()).await;
        *self.active.write().await = active;
        *self.current_tier.write().await = tier;
        *self.fallback_chain.write().await = tier.fallback_chain();
        self.stats.write().await.current_tier = Some(tier.as_str().to_string());
    }

    pub async fn current_tier(&self) -> Tier {
        *self.current_tier.read().await
    }

    pub async fn get_tier_info(&self) -> (Tier, Vec<Tier>) {
        (*self.current_tier.read().await, self.fallback_chain.read().await.clone())
    }

    pub async fn get_stats(&self) -> EngineStats {
        self.stats.read().await.clone()
    }

    /// The storage adapter shared across every tier. Exposed so callers
    /// (e.g. the CLI's `optimize` subcommand) can run the optimiser
    /// against the same durable records the engine writes to, without the
    /// optimiser needing its own `EngineOps` handle.
    pub fn storage(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }

    /// Runs `op` against the active engine; on error, if a fallback tier
    /// remains, initialises it and retries `op` exactly once. Exhausting
    /// the chain surfaces `FallbackExhausted` (spec.md §4.7, §7).
    async fn with_fallback<T, F>(&self, op: F) -> Result<T, EngineError>
    where
        F: for<'a> Fn(&'a dyn EngineOps) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, EngineError>> + Send + 'a>>,
    {
        self.stats.write().await.operation_count += 1;

        let first_attempt = {
            let active = self.active.read().await;
            op(active.as_ref()).await
        };

        match first_attempt {
            Ok(value) => Ok(value),
            Err(first_error) => {
                let mut chain = self.fallback_chain.write().await;
                let Some(next_tier) = chain.first().copied() else {
                    return Err(EngineError::FallbackExhausted);
                };
                tracing::warn!(
                    error = %first_error,
                    from_tier = self.current_tier.read().await.as_str(),
                    to_tier = next_tier.as_str(),
                    "memory engine operation failed; falling back"
                );
                chain.remove(0);
                let remaining_chain = chain.clone();
                drop(chain);

                let next_engine = build_engine_for_tier(next_tier, &self.config, self.storage.clone()).await;
                let result = op(next_engine.as_ref()).await;

                *self.active.write().await = next_engine;
                *self.current_tier.write().await = next_tier;
                *self.fallback_chain.write().await = remaining_chain;
                let mut stats = self.stats.write().await;
                stats.fallback_count += 1;
                stats.current_tier = Some(next_tier.as_str().to_string());
                drop(stats);

                result
            }
        }
    }
}

#[async_trait]
impl EngineOps for UnifiedEngine {
    async fn remember(
        &self,
        content: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: RememberOptions,
    ) -> Result<String, EngineError> {
        self.with_fallback(|engine| {
            let content = content.to_string();
            let tenant_id = tenant_id.to_string();
            let agent_id = agent_id.map(str::to_string);
            let options = options.clone();
            Box::pin(async move { engine.remember(&content, &tenant_id, agent_id.as_deref(), options).await })
        })
        .await
    }

    async fn recall(
        &self,
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: RecallOptions,
    ) -> Result<Vec<VectorResult>, EngineError> {
        self.with_fallback(|engine| {
            let query = query.to_string();
            let tenant_id = tenant_id.to_string();
            let agent_id = agent_id.map(str::to_string);
            let options = options.clone();
            Box::pin(async move { engine.recall(&query, &tenant_id, agent_id.as_deref(), options).await })
        })
        .await
    }

    async fn forget(
        &self,
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        threshold: f32,
    ) -> Result<usize, EngineError> {
        self.with_fallback(|engine| {
            let query = query.to_string();
            let tenant_id = tenant_id.to_string();
            let agent_id = agent_id.map(str::to_string);
            Box::pin(async move { engine.forget(&query, &tenant_id, agent_id.as_deref(), threshold).await })
        })
        .await
    }

    async fn context(&self, request: ContextRequest) -> Result<ContextResult, EngineError> {
        self.with_fallback(|engine| {
            let request = request.clone();
            Box::pin(async move { engine.context(request).await })
        })
        .await
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), EngineError> {
        self.with_fallback(|engine| {
            let id = id.to_string();
            let patch = patch.clone();
            Box::pin(async move { engine.update(&id, patch).await })
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool, EngineError> {
        self.with_fallback(|engine| {
            let id = id.to_string();
            Box::pin(async move { engine.delete(&id).await })
        })
        .await
    }

    async fn list(&self, filter: &StorageFilter) -> Result<Vec<MemoryRecord>, EngineError> {
        self.with_fallback(|engine| {
            let filter = filter.clone();
            Box::pin(async move { engine.list(&filter).await })
        })
        .await
    }

    async fn health_check(&self) -> Result<EngineHealth, EngineError> {
        let active = self.active.read().await;
        active.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_with_mock_provider_selects_smart_or_basic() {
        let mut config = AppConfig::default();
        config.embedding.provider = "mock".to_string();
        let engine = UnifiedEngine::initialize(config).await;
        let (tier, _) = engine.get_tier_info().await;
        assert!(matches!(tier, Tier::Smart | Tier::Basic));
    }

    #[tokio::test]
    async fn switch_tier_updates_current_tier_and_stats() {
        let config = AppConfig::default();
        let engine = UnifiedEngine::initialize(config).await;
        engine.switch_tier(Tier::Mock).await;
        assert_eq!(engine.current_tier().await, Tier::Mock);
        let stats = engine.get_stats().await;
        assert_eq!(stats.current_tier.as_deref(), Some("mock"));
    }

    #[tokio::test]
    async fn remember_then_recall_round_trips_through_unified_engine() {
        let mut config = AppConfig::default();
        config.embedding.provider = "mock".to_string();
        let engine = UnifiedEngine::initialize(config).await;
        engine.switch_tier(Tier::Mock).await;

        let id = engine
            .remember("I prefer dark mode", "tenant-1", None, RememberOptions::default())
            .await
            .unwrap();
        assert!(!id.is_empty());

        let mut options = RecallOptions::default();
        options.threshold = 0.0;
        let results = engine
            .recall("I prefer dark mode", "tenant-1", None, options)
            .await
            .unwrap();
        assert!(!results.is_empty());
    }
}
