#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("vector store not initialised")]
    NotInitialised,
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("backend error: {0}")]
    Backend(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
}
