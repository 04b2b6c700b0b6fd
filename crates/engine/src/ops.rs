use async_trait::async_trait;

use agentmem_model::{MemoryRecord, RecordPatch, StorageFilter, VectorResult};

use crate::error::EngineError;
use crate::health::EngineHealth;
use crate::options::{ContextRequest, ContextResult, RecallOptions, RememberOptions};

/// Capability contract shared by every tier implementation (spec.md §4.6,
/// §4.7). `UnifiedEngine` owns a `Box<dyn EngineOps>` and swaps it on
/// fallback rather than branching on a tier enum at every call site (design
/// note §9: "deep inheritance → capability interfaces").
#[async_trait]
pub trait EngineOps: Send + Sync {
    async fn remember(
        &self,
        content: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: RememberOptions,
    ) -> Result<String, EngineError>;

    async fn recall(
        &self,
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: RecallOptions,
    ) -> Result<Vec<VectorResult>, EngineError>;

    async fn forget(
        &self,
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        threshold: f32,
    ) -> Result<usize, EngineError>;

    async fn context(&self, request: ContextRequest) -> Result<ContextResult, EngineError>;

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), EngineError>;

    async fn delete(&self, id: &str) -> Result<bool, EngineError>;

    async fn list(&self, filter: &StorageFilter) -> Result<Vec<MemoryRecord>, EngineError>;

    async fn health_check(&self) -> Result<EngineHealth, EngineError>;
}
