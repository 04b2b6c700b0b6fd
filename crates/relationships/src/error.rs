#[derive(Debug, thiserror::Error)]
pub enum RelationshipError {
    #[error("relationship {0} not found")]
    NotFound(String),
    #[error("source and target memory ids must differ")]
    SelfReference,
}
