use agentmem_model::{Conflict, ConflictPriority, ConflictStatus, ConflictType};

/// Filter recognised by `ConflictResolver::query` (spec.md §6 Conflict
/// surface).
#[derive(Debug, Clone, Default)]
pub struct ConflictQuery {
    pub tenant_id: Option<String>,
    pub status: Option<ConflictStatus>,
    pub conflict_type: Option<ConflictType>,
    pub min_priority: Option<ConflictPriority>,
    pub agent_id: Option<String>,
}

impl ConflictQuery {
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, conflict: &Conflict) -> bool {
        if let Some(tenant_id) = &self.tenant_id {
            if &conflict.tenant_id != tenant_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if conflict.status != status {
                return false;
            }
        }
        if let Some(conflict_type) = self.conflict_type {
            if conflict.conflict_type != conflict_type {
                return false;
            }
        }
        if let Some(min_priority) = self.min_priority {
            if conflict.priority < min_priority {
                return false;
            }
        }
        if let Some(agent_id) = &self.agent_id {
            if !conflict.involved_agents.iter().any(|a| a == agent_id) {
                return false;
            }
        }
        true
    }
}
