use agentmem_model::{ConflictType, Resolution};

/// A configured resolution rule: highest-priority enabled rule matching
/// `conflict_type` wins (spec.md §4.11 strategy selection).
pub struct ConflictRule {
    pub id: String,
    pub conflict_type: ConflictType,
    pub priority: i32,
    pub enabled: bool,
    pub action: Box<dyn Fn(&[agentmem_model::ConflictingData]) -> Resolution + Send + Sync>,
}

/// Picks the highest-priority enabled rule matching `conflict_type`.
pub fn best_matching_rule<'a>(
    rules: &'a [ConflictRule],
    conflict_type: ConflictType,
) -> Option<&'a ConflictRule> {
    rules
        .iter()
        .filter(|r| r.enabled && r.conflict_type == conflict_type)
        .max_by_key(|r| r.priority)
}
