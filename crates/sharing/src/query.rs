use chrono::{DateTime, Utc};
use serde_json::Value;

use agentmem_model::{AccessAction, MemoryType, SharedMemory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Timestamp,
    Relevance,
    AccessCount,
    Version,
}

#[derive(Debug, Clone, Default)]
pub struct ShareQuery {
    pub agents: Vec<String>,
    pub types: Vec<MemoryType>,
    /// Tag intersection: every tag here must be present on the record.
    pub tags: Vec<String>,
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub permission_required: Option<AccessAction>,
    pub content_substring: Option<String>,
    pub metadata_equals: Option<(String, Value)>,
    pub sort: Option<SortKey>,
}

impl ShareQuery {
    fn matches(&self, share: &SharedMemory) -> bool {
        if !self.agents.is_empty() && !self.agents.contains(&share.owner_id) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&share.record.memory_type) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().all(|t| share.record.tags.contains(t)) {
            return false;
        }
        if let Some((since, until)) = self.time_range {
            if share.record.created_at < since || share.record.created_at > until {
                return false;
            }
        }
        if let Some(action) = self.permission_required {
            let granted_to_someone = match action {
                AccessAction::Read => share.permissions.public || !share.permissions.read.is_empty(),
                AccessAction::Write => !share.permissions.write.is_empty(),
                AccessAction::Delete => !share.permissions.delete.is_empty(),
            };
            if !granted_to_someone {
                return false;
            }
        }
        if let Some(substring) = &self.content_substring {
            if !share.record.content.contains(substring.as_str()) {
                return false;
            }
        }
        if let Some((key, expected)) = &self.metadata_equals {
            if share.record.context.get(key) != Some(expected) {
                return false;
            }
        }
        true
    }

    /// `10*substring_match_count + 5*max(0,(max_age-age)/max_age) +
    /// 0.1*access_history.length + 0.5*version` (spec.md §4.10).
    fn relevance(&self, share: &SharedMemory, now: DateTime<Utc>, max_age_days: i64) -> f32 {
        let substring_match_count = self
            .content_substring
            .as_ref()
            .map(|s| share.record.content.matches(s.as_str()).count())
            .unwrap_or(0) as f32;
        let age_days = (now - share.record.created_at).num_seconds() as f32 / 86_400.0;
        let max_age = max_age_days as f32;
        let recency = if max_age > 0.0 {
            (5.0 * ((max_age - age_days) / max_age)).max(0.0)
        } else {
            0.0
        };
        10.0 * substring_match_count
            + recency
            + 0.1 * share.access_history.len() as f32
            + 0.5 * share.version as f32
    }

    pub fn run<'a>(
        &self,
        shares: impl Iterator<Item = &'a SharedMemory>,
        now: DateTime<Utc>,
        max_age_days: i64,
    ) -> Vec<&'a SharedMemory> {
        let mut matched: Vec<&SharedMemory> = shares.filter(|s| self.matches(s)).collect();
        match self.sort {
            Some(SortKey::Timestamp) => {
                matched.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at))
            }
            Some(SortKey::Relevance) => matched.sort_by(|a, b| {
                self.relevance(b, now, max_age_days)
                    .partial_cmp(&self.relevance(a, now, max_age_days))
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            Some(SortKey::AccessCount) => {
                matched.sort_by(|a, b| b.record.access_count.cmp(&a.record.access_count))
            }
            Some(SortKey::Version) => matched.sort_by(|a, b| b.version.cmp(&a.version)),
            None => {}
        }
        matched
    }
}
