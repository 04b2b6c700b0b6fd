#[derive(Debug, thiserror::Error)]
pub enum ConflictError {
    #[error("conflict {0} not found")]
    NotFound(String),
    #[error("rule {0} not found")]
    RuleNotFound(String),
    #[error("approver {0} is not on the approval list")]
    UnknownApprover(String),
    #[error("conflict {0} has no pending approval")]
    NoApprovalPending(String),
    #[error("conflict {0} requires approvers before it can be resolved")]
    ApproversRequired(String),
    #[error("conflict {0} is already resolved")]
    AlreadyResolved(String),
    #[error("no conflict between the supplied entries")]
    NoConflict,
}
