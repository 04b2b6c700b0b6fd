use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agentmem_model::Permissions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestResponse {
    pub agent_id: String,
    pub approved: bool,
    pub message: Option<String>,
    pub responded_at: DateTime<Utc>,
}

/// A request from `requester_id` for `perms` on a share (spec.md §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingRequest {
    pub id: String,
    pub share_id: String,
    pub requester_id: String,
    pub requested_permissions: Permissions,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub responses: Vec<RequestResponse>,
    pub created_at: DateTime<Utc>,
}

impl SharingRequest {
    pub fn new(
        share_id: impl Into<String>,
        requester_id: impl Into<String>,
        requested_permissions: Permissions,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            share_id: share_id.into(),
            requester_id: requester_id.into(),
            requested_permissions,
            message,
            status: RequestStatus::Pending,
            responses: Vec::new(),
            created_at: now,
        }
    }
}
