#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("storage error: {0}")]
    Storage(#[from] agentmem_storage::StorageError),
    #[error("vector store error: {0}")]
    Vector(#[from] agentmem_vector::VectorError),
}
