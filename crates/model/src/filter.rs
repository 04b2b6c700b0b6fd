use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{MemoryRecord, MemoryType};

/// Filter recognised by `StorageAdapter::list` (spec.md §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageFilter {
    pub tenant_id: Option<String>,
    pub agent_id: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub min_importance: Option<f32>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub offset: usize,
    pub limit: usize,
}

impl StorageFilter {
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &MemoryRecord) -> bool {
        if let Some(tenant_id) = &self.tenant_id {
            if &record.tenant_id != tenant_id {
                return false;
            }
        }
        if let Some(agent_id) = &self.agent_id {
            if record.agent_id.as_deref() != Some(agent_id.as_str()) {
                return false;
            }
        }
        if let Some(memory_type) = &self.memory_type {
            if &record.memory_type != memory_type {
                return false;
            }
        }
        if let Some(min_importance) = self.min_importance {
            if record.importance < min_importance {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.created_at > until {
                return false;
            }
        }
        true
    }
}

/// Query carried into `VectorStore::search` (spec.md §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorQuery {
    pub text: String,
    pub tenant_id: Option<String>,
    pub agent_id: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub limit: usize,
    pub threshold: f32,
    pub include_context: bool,
    pub time_decay: bool,
}

impl VectorQuery {
    pub fn new(text: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tenant_id: Some(tenant_id.into()),
            agent_id: None,
            memory_type: None,
            limit: 10,
            threshold: 0.7,
            include_context: false,
            time_decay: false,
        }
    }

    pub fn matches_filters(&self, record: &MemoryRecord) -> bool {
        if let Some(tenant_id) = &self.tenant_id {
            if &record.tenant_id != tenant_id {
                return false;
            }
        }
        if let Some(agent_id) = &self.agent_id {
            if record.agent_id.as_deref() != Some(agent_id.as_str()) {
                return false;
            }
        }
        if let Some(memory_type) = &self.memory_type {
            if &record.memory_type != memory_type {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorResult {
    pub record: MemoryRecord,
    pub score: f32,
}
