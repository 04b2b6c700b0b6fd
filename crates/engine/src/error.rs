use agentmem_embedding::EmbeddingError;
use agentmem_storage::StorageError;
use agentmem_vector::VectorError;

/// Error taxonomy shared across every engine-facing operation (spec.md §7).
/// Variant *kinds* are stable; the wrapped strings are diagnostic only.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("content is empty after trimming")]
    InvalidContent,
    #[error("query is empty")]
    InvalidQuery,
    #[error("engine not initialised")]
    NotInitialised,
    #[error("adapter not initialised")]
    AdapterNotInitialised,
    #[error("adapter failure: {0}")]
    AdapterFailure(String),
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),
    #[error("operation timed out")]
    Timeout,
    #[error("permission denied")]
    PermissionDenied,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict already resolved")]
    ConflictAlreadyResolved,
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),
    #[error("fallback chain exhausted")]
    FallbackExhausted,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AdapterNotInitialised => EngineError::AdapterNotInitialised,
            other => EngineError::AdapterFailure(other.to_string()),
        }
    }
}

impl From<VectorError> for EngineError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::NotInitialised => EngineError::AdapterNotInitialised,
            other => EngineError::AdapterFailure(other.to_string()),
        }
    }
}

impl From<EmbeddingError> for EngineError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::EmptyContent => EngineError::InvalidContent,
            other => EngineError::EmbeddingFailed(other.to_string()),
        }
    }
}
