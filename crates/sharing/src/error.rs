#[derive(Debug, thiserror::Error)]
pub enum SharingError {
    #[error("shared memory {0} not found")]
    NotFound(String),
    #[error("sharing request {0} not found")]
    RequestNotFound(String),
    #[error("agent {agent_id} denied {action:?} on {share_id}")]
    PermissionDenied {
        agent_id: String,
        share_id: String,
        action: agentmem_model::AccessAction,
    },
}
