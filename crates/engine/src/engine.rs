use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use agentmem_embedding::EmbeddingProvider;
use agentmem_model::{
    MemoryRecord, MemoryType, RecordPatch, StorageFilter, VectorQuery, VectorResult,
};
use agentmem_storage::StorageAdapter;
use agentmem_vector::VectorStore;

use crate::error::EngineError;
use crate::health::{ComponentHealth, EngineHealth};
use crate::ops::EngineOps;
use crate::options::{summarize, ContextRequest, ContextResult, RecallOptions, RememberOptions};

/// Time-decay half-life in days (spec.md §4.6, Glossary: "30-day half-life").
const TIME_DECAY_HALF_LIFE_DAYS: f64 = 30.0;
/// Floor applied to a time-decayed score (spec.md §4.6).
const TIME_DECAY_FLOOR: f32 = 0.1;
/// Low threshold used to gather `forget` candidates (spec.md §4.6).
const FORGET_CANDIDATE_THRESHOLD: f32 = 0.1;

/// Orchestrates `ClassifierAndScorer` -> `EmbeddingProvider` -> `VectorStore`
/// + `StorageAdapter` (spec.md §4.6). Generic over the three collaborators
/// so every capability tier in §4.7 can assemble its own combination while
/// sharing this single implementation.
pub struct MemoryEngine {
    storage: Arc<dyn StorageAdapter>,
    vector: Arc<dyn VectorStore>,
    embedding: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl MemoryEngine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        vector: Arc<dyn VectorStore>,
        embedding: Arc<dyn EmbeddingProvider>,
        dimension: usize,
    ) -> Self {
        Self {
            storage,
            vector,
            embedding,
            dimension,
        }
    }

    async fn recall_internal(
        &self,
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: &RecallOptions,
    ) -> Result<Vec<VectorResult>, EngineError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidQuery);
        }
        let embedded = self.embedding.embed(trimmed).await?;

        let mut vector_query = VectorQuery::new(trimmed, tenant_id);
        vector_query.agent_id = agent_id.map(str::to_string);
        vector_query.memory_type = options.memory_type;
        vector_query.limit = options.limit;
        vector_query.threshold = options.threshold;
        vector_query.include_context = options.include_context;
        vector_query.time_decay = options.time_decay;

        let mut results = self.vector.search(&embedded.vector, &vector_query).await?;

        if options.time_decay {
            let now = Utc::now();
            for result in &mut results {
                let anchor = result
                    .record
                    .last_accessed_at
                    .max(result.record.created_at);
                let age_days = (now - anchor).num_seconds().max(0) as f64 / 86_400.0;
                let decay = (-age_days / TIME_DECAY_HALF_LIFE_DAYS).exp();
                result.score = ((result.score as f64 * decay) as f32).max(TIME_DECAY_FLOOR);
            }
            // Stable sort descending; ties keep their relative (pre-decay) order,
            // so a more recently accessed record at equal score never sinks
            // below an older one (spec.md §8 invariant 4).
            results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        }

        for result in &mut results {
            // access_count/last_accessed_at are engine-owned side effects, not
            // part of `RecordPatch` (spec.md §4.6: "updates last_accessed_at
            // and increments access_count for returned records").
            if let Some(record) = self.touch_access(&result.record.id).await? {
                result.record = record;
            }
        }

        Ok(results)
    }

    async fn touch_access(&self, id: &str) -> Result<Option<MemoryRecord>, EngineError> {
        if let Some(mut record) = self.storage.retrieve(id).await? {
            record.mark_accessed(Utc::now());
            self.storage.store(record.clone()).await?;
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl EngineOps for MemoryEngine {
    async fn remember(
        &self,
        content: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: RememberOptions,
    ) -> Result<String, EngineError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidContent);
        }

        let memory_type = options
            .memory_type
            .unwrap_or_else(|| agentmem_classifier::classify(trimmed));
        let importance = options
            .importance
            .unwrap_or_else(|| agentmem_classifier::importance(trimmed));

        let mut record = MemoryRecord::new(
            tenant_id,
            agent_id.map(str::to_string),
            memory_type,
            trimmed,
            importance,
            Utc::now(),
        )
        .map_err(|_| EngineError::InvalidContent)?;
        record.emotional_weight = options.emotional_weight;
        record.tags = Default::default();
        record.context = options.context;
        record.ttl = options.ttl;

        let embedded = self.embedding.embed(trimmed).await?;
        record.embedding = Some(embedded.vector.clone());
        record
            .validate_embedding_dimension(self.dimension)
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        self.vector.upsert(&record, &embedded.vector).await?;
        self.storage.store(record.clone()).await?;

        Ok(record.id)
    }

    async fn recall(
        &self,
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: RecallOptions,
    ) -> Result<Vec<VectorResult>, EngineError> {
        self.recall_internal(query, tenant_id, agent_id, &options)
            .await
    }

    async fn forget(
        &self,
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        threshold: f32,
    ) -> Result<usize, EngineError> {
        let candidate_options = RecallOptions {
            memory_type: None,
            limit: 0,
            threshold: FORGET_CANDIDATE_THRESHOLD,
            include_context: false,
            time_decay: false,
        };
        let candidates = self
            .recall_internal(query, tenant_id, agent_id, &candidate_options)
            .await?;

        let mut deleted = 0usize;
        for candidate in candidates.into_iter().filter(|c| c.score >= threshold) {
            self.vector.delete(&[candidate.record.id.clone()]).await?;
            if self.storage.delete(&candidate.record.id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn context(&self, request: ContextRequest) -> Result<ContextResult, EngineError> {
        let query_text = request.topic.clone().unwrap_or_else(|| "*".to_string());
        let threshold = if request.topic.is_some() { 0.6 } else { 0.0 };
        let options = RecallOptions {
            memory_type: None,
            limit: request.limit,
            threshold,
            include_context: true,
            time_decay: false,
        };
        let mut results = self
            .recall_internal(
                &query_text,
                &request.tenant_id,
                request.agent_id.as_deref(),
                &options,
            )
            .await?;

        if let Some(types) = &request.memory_types {
            results.retain(|r| types.contains(&r.record.memory_type));
        }

        let memories: Vec<MemoryRecord> = results.iter().map(|r| r.record.clone()).collect();
        let confidence = if results.is_empty() {
            0.0
        } else {
            let mean_score: f32 =
                results.iter().map(|r| r.score).sum::<f32>() / results.len() as f32;
            let mean_confidence: f32 =
                memories.iter().map(|m| m.confidence).sum::<f32>() / memories.len() as f32;
            (mean_score + mean_confidence) / 2.0
        };

        Ok(ContextResult {
            total_count: memories.len(),
            context_summary: summarize(&memories),
            confidence,
            generated_at: Utc::now(),
            memories,
        })
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), EngineError> {
        if let Some(embedding) = &patch.embedding {
            if embedding.len() != self.dimension {
                return Err(EngineError::Internal(format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    embedding.len()
                )));
            }
        }
        self.storage.update(id, patch.clone()).await?;
        if let Some(record) = self.storage.retrieve(id).await? {
            if let Some(embedding) = record.embedding.clone().or(patch.embedding) {
                self.vector.upsert(&record, &embedding).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, EngineError> {
        self.vector.delete(&[id.to_string()]).await?;
        Ok(self.storage.delete(id).await?)
    }

    async fn list(&self, filter: &StorageFilter) -> Result<Vec<MemoryRecord>, EngineError> {
        Ok(self.storage.list(filter).await?)
    }

    async fn health_check(&self) -> Result<EngineHealth, EngineError> {
        let mut components = std::collections::HashMap::new();

        let storage_health = match self.storage.list(&StorageFilter::default()).await {
            Ok(_) => ComponentHealth::healthy(),
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        };
        components.insert("storage".to_string(), storage_health);

        let vector_health = match self.vector.health().await {
            Ok(true) => ComponentHealth::healthy(),
            Ok(false) => ComponentHealth::unhealthy("vector store reported unhealthy"),
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        };
        components.insert("vector".to_string(), vector_health);

        let embedding_health = match self.embedding.embed("health-check-probe").await {
            Ok(_) => ComponentHealth::healthy(),
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        };
        components.insert("embedding".to_string(), embedding_health);

        Ok(EngineHealth::from_components(true, components))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmem_embedding::MockEmbeddingProvider;
    use agentmem_storage::InMemoryAdapter;
    use agentmem_vector::InMemoryVectorStore;
    use std::time::Duration;

    async fn engine() -> MemoryEngine {
        let storage = Arc::new(InMemoryAdapter::new());
        let vector = Arc::new(InMemoryVectorStore::new());
        vector.initialize().await.unwrap();
        let embedding = Arc::new(MockEmbeddingProvider::new(16, Duration::ZERO, 0.0));
        MemoryEngine::new(storage, vector, embedding, 16)
    }

    #[tokio::test]
    async fn remember_then_retrieve_preserves_content_and_tenant() {
        let engine = engine().await;
        let id = engine
            .remember("I prefer dark mode", "tenant-1", None, RememberOptions::default())
            .await
            .unwrap();
        let found = engine
            .list(&StorageFilter::for_tenant("tenant-1"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].content, "I prefer dark mode");
        assert_eq!(found[0].memory_type, MemoryType::Preference);
    }

    #[tokio::test]
    async fn remember_rejects_blank_content() {
        let engine = engine().await;
        let err = engine
            .remember("   ", "tenant-1", None, RememberOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidContent));
    }

    #[tokio::test]
    async fn recall_rejects_blank_query() {
        let engine = engine().await;
        let err = engine
            .recall("   ", "tenant-1", None, RecallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuery));
    }

    #[tokio::test]
    async fn forget_deletes_only_candidates_above_threshold() {
        let engine = engine().await;
        engine
            .remember("identical phrase one", "tenant-1", None, RememberOptions::default())
            .await
            .unwrap();
        let deleted = engine
            .forget("identical phrase one", "tenant-1", None, 0.9)
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        let remaining = engine
            .list(&StorageFilter::for_tenant("tenant-1"))
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn context_without_topic_summarizes_all_memories() {
        let engine = engine().await;
        engine
            .remember("I prefer dark mode", "tenant-1", None, RememberOptions::default())
            .await
            .unwrap();
        engine
            .remember("todo: ship the release", "tenant-1", None, RememberOptions::default())
            .await
            .unwrap();

        let request = ContextRequest::new("tenant-1");
        let result = engine.context(request).await.unwrap();
        assert_eq!(result.total_count, 2);
        assert!(result.context_summary.starts_with("2 memories"));
    }

    #[tokio::test]
    async fn health_check_reports_healthy_when_all_components_respond() {
        let engine = engine().await;
        let health = engine.health_check().await.unwrap();
        assert_eq!(health.status, crate::health::HealthStatus::Healthy);
    }
}
