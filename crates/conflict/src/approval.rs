use agentmem_model::{Approval, ApprovalResponse};

use crate::error::ConflictError;

/// Appends `agent_id`'s response. Returns `true` once approved-fraction
/// reaches `threshold` (caller should then apply the resolution and
/// transition to resolved), matching spec.md §4.11 Approval.
pub fn record_response(
    approval: &mut Approval,
    agent_id: &str,
    approved: bool,
    reason: Option<String>,
) -> Result<bool, ConflictError> {
    if !approval.approvers.iter().any(|a| a == agent_id) {
        return Err(ConflictError::UnknownApprover(agent_id.to_string()));
    }
    approval.responses.push(ApprovalResponse {
        agent_id: agent_id.to_string(),
        approved,
        reason,
        responded_at: chrono::Utc::now(),
    });
    Ok(approval.approved_fraction() >= approval.threshold)
}

/// `true` once every approver has responded but the threshold was never
/// reached — the caller should transition to escalated.
pub fn should_escalate(approval: &Approval) -> bool {
    approval.all_responded() && approval.approved_fraction() < approval.threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approval(threshold: f32) -> Approval {
        Approval {
            required: true,
            approvers: vec!["a".to_string(), "b".to_string()],
            responses: Vec::new(),
            threshold,
        }
    }

    #[test]
    fn reaches_threshold_after_enough_approvals() {
        let mut approval = approval(0.5);
        assert!(!record_response(&mut approval, "a", true, None).unwrap());
        assert!(record_response(&mut approval, "b", true, None).unwrap());
    }

    #[test]
    fn escalates_when_all_responded_below_threshold() {
        let mut approval = approval(0.9);
        record_response(&mut approval, "a", true, None).unwrap();
        record_response(&mut approval, "b", false, None).unwrap();
        assert!(should_escalate(&approval));
    }

    #[test]
    fn unknown_approver_is_rejected() {
        let mut approval = approval(0.5);
        let err = record_response(&mut approval, "stranger", true, None).unwrap_err();
        assert!(matches!(err, ConflictError::UnknownApprover(_)));
    }
}
