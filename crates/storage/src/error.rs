#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("adapter not initialised")]
    AdapterNotInitialised,
    #[error("adapter failure: {0}")]
    AdapterFailure(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("could not acquire file lock after {0} attempts")]
    LockTimeout(usize),
}
