use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use agentmem_model::{MemoryRecord, RecordPatch, StorageFilter, VectorResult};
use agentmem_storage::StorageAdapter;

use crate::error::EngineError;
use crate::health::{ComponentHealth, EngineHealth};
use crate::ops::EngineOps;
use crate::options::{summarize, ContextRequest, ContextResult, RecallOptions, RememberOptions};

/// Tier `basic` (spec.md §4.7): keyword search over the storage adapter,
/// with no embedding and no vector index. Classification/importance scoring
/// and the `remember`/`forget`/`context` algorithms are identical to
/// `MemoryEngine`; only the recall mechanism differs.
pub struct KeywordEngine {
    storage: Arc<dyn StorageAdapter>,
}

impl KeywordEngine {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Token-overlap score in `[0, 1]`: fraction of query tokens present in
    /// the record's content, case-insensitively. A deterministic substitute
    /// for cosine similarity when no embedding is available.
    fn keyword_score(query: &str, content: &str) -> f32 {
        let query_tokens: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if query_tokens.is_empty() {
            return 0.0;
        }
        let content_lower = content.to_lowercase();
        let matched = query_tokens
            .iter()
            .filter(|token| content_lower.contains(token.as_str()))
            .count();
        matched as f32 / query_tokens.len() as f32
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

        let mut filter = StorageFilter::for_tenant(tenant_id);
        filter.agent_id = agent_id.map(str::to_string);
        filter.memory_type = options.memory_type;
        let candidates = self.storage.list(&filter).await?;

        let mut scored: Vec<VectorResult> = if trimmed == "*" {
            candidates
                .into_iter()
                .map(|record| VectorResult { record, score: 1.0 })
                .collect()
        } else {
            candidates
                .into_iter()
                .map(|record| {
                    let score = Self::keyword_score(trimmed, &record.content);
                    VectorResult { record, score }
                })
                .filter(|result| result.score >= options.threshold)
                .collect()
        };

        if options.time_decay {
            let now = Utc::now();
            for result in &mut scored {
                let anchor = result
                    .record
                    .last_accessed_at
                    .max(result.record.created_at);
                let age_days = (now - anchor).num_seconds().max(0) as f64 / 86_400.0;
                let decay = (-age_days / 30.0).exp();
                result.score = ((result.score as f64 * decay) as f32).max(0.1);
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        if options.limit > 0 && scored.len() > options.limit {
            scored.truncate(options.limit);
        }

        for result in &mut scored {
            if let Some(mut record) = self.storage.retrieve(&result.record.id).await? {
                record.mark_accessed(Utc::now());
                self.storage.store(record.clone()).await?;
                result.record = record;
            }
        }

        Ok(scored)
    }
}

#[async_trait]
impl EngineOps for KeywordEngine {
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
        record.context = options.context;
        record.ttl = options.ttl;

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
            threshold: 0.1,
            include_context: false,
            time_decay: false,
        };
        let candidates = self
            .recall_internal(query, tenant_id, agent_id, &candidate_options)
            .await?;

        let mut deleted = 0usize;
        for candidate in candidates.into_iter().filter(|c| c.score >= threshold) {
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
        Ok(self.storage.update(id, patch).await?)
    }

    async fn delete(&self, id: &str) -> Result<bool, EngineError> {
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
        Ok(EngineHealth::from_components(true, components))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmem_storage::InMemoryAdapter;

    fn engine() -> KeywordEngine {
        KeywordEngine::new(Arc::new(InMemoryAdapter::new()))
    }

    #[tokio::test]
    async fn remember_then_recall_finds_overlapping_keywords() {
        let engine = engine();
        engine
            .remember("the deploy ships tomorrow", "tenant-1", None, RememberOptions::default())
            .await
            .unwrap();
        let mut options = RecallOptions::default();
        options.threshold = 0.3;
        let results = engine
            .recall("deploy ships", "tenant-1", None, options)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn recall_rejects_blank_query() {
        let engine = engine();
        let err = engine
            .recall("", "tenant-1", None, RecallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuery));
    }
}
