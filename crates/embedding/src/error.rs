#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty content")]
    EmptyContent,
    #[error("provider failure: {0}")]
    ProviderFailure(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
