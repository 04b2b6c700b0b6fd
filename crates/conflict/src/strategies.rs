use std::collections::HashMap;

use agentmem_model::{ConflictingData, Resolution, ResolutionStrategy};

fn data_key(value: &serde_json::Value) -> String {
    value.to_string()
}

/// Picks the entry with the highest confidence.
pub fn automatic(entries: &[ConflictingData]) -> Resolution {
    let winner = entries
        .iter()
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
        .expect("entries is non-empty");
    Resolution {
        resolved_data: winner.data.clone(),
        confidence: winner.confidence,
        reasoning: format!("highest confidence entry from {}", winner.agent_id),
        involved_strategies: vec![ResolutionStrategy::Automatic],
    }
}

/// Majority vote on distinct `data` values; ties broken by highest
/// confidence among the tied groups.
pub fn consensus(entries: &[ConflictingData]) -> Resolution {
    let mut groups: HashMap<String, Vec<&ConflictingData>> = HashMap::new();
    for entry in entries {
        groups.entry(data_key(&entry.data)).or_default().push(entry);
    }
    let max_votes = groups.values().map(|g| g.len()).max().unwrap_or(0);
    let winner = groups
        .values()
        .filter(|g| g.len() == max_votes)
        .flat_map(|g| g.iter())
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
        .expect("entries is non-empty");
    Resolution {
        resolved_data: winner.data.clone(),
        confidence: winner.confidence,
        reasoning: format!("majority vote ({max_votes}/{}) ties broken by confidence", entries.len()),
        involved_strategies: vec![ResolutionStrategy::Consensus],
    }
}

/// Picks the entry from the highest-ranked agent per `ranking`; agents
/// absent from `ranking` are treated as rank 0.
pub fn priority(entries: &[ConflictingData], ranking: &HashMap<String, i32>) -> Resolution {
    let winner = entries
        .iter()
        .max_by_key(|e| ranking.get(&e.agent_id).copied().unwrap_or(0))
        .expect("entries is non-empty");
    Resolution {
        resolved_data: winner.data.clone(),
        confidence: winner.confidence,
        reasoning: format!("highest-ranked agent {}", winner.agent_id),
        involved_strategies: vec![ResolutionStrategy::Priority],
    }
}

/// Field-wise union across all entries' JSON objects. Scalars use
/// last-write-wins (by timestamp) unless the field name is in
/// `additive_fields`, in which case array-typed values are concatenated and
/// deduped.
pub fn merge(entries: &[ConflictingData], additive_fields: &[String]) -> Resolution {
    let mut sorted: Vec<&ConflictingData> = entries.iter().collect();
    sorted.sort_by_key(|e| e.timestamp);

    let mut merged = serde_json::Map::new();
    for entry in &sorted {
        if let serde_json::Value::Object(fields) = &entry.data {
            for (key, value) in fields {
                if additive_fields.contains(key) {
                    let slot = merged
                        .entry(key.clone())
                        .or_insert_with(|| serde_json::Value::Array(Vec::new()));
                    if let serde_json::Value::Array(existing) = slot {
                        if let serde_json::Value::Array(incoming) = value {
                            for item in incoming {
                                if !existing.contains(item) {
                                    existing.push(item.clone());
                                }
                            }
                        } else if !existing.contains(value) {
                            existing.push(value.clone());
                        }
                    }
                } else {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }

    let confidence = sorted.iter().map(|e| e.confidence).sum::<f32>() / sorted.len() as f32;
    Resolution {
        resolved_data: serde_json::Value::Object(merged),
        confidence,
        reasoning: "field-wise union, last-write-wins for non-additive fields".to_string(),
        involved_strategies: vec![ResolutionStrategy::Merge],
    }
}

/// Picks the entry with the latest timestamp.
pub fn temporal(entries: &[ConflictingData]) -> Resolution {
    let winner = entries
        .iter()
        .max_by_key(|e| e.timestamp)
        .expect("entries is non-empty");
    Resolution {
        resolved_data: winner.data.clone(),
        confidence: winner.confidence,
        reasoning: format!("latest timestamp from {}", winner.agent_id),
        involved_strategies: vec![ResolutionStrategy::Temporal],
    }
}

/// Caller-supplied payload; confidence is fixed at 1.0.
pub fn manual(payload: serde_json::Value) -> Resolution {
    Resolution {
        resolved_data: payload,
        confidence: 1.0,
        reasoning: "manually supplied resolution".to_string(),
        involved_strategies: vec![ResolutionStrategy::Manual],
    }
}

/// Delegates to an external classifier/recommender's pick (spec.md §4.11:
/// "ml_guided" defers to an ML recommendation rather than a fixed rule).
/// `recommended` is whatever concrete strategy the recommender hook
/// returned; this dispatches to that strategy's own function and tags the
/// result as ml-guided on top of it. Strategies the recommender has no
/// business picking (`Manual`, recursive `MlGuided`/`RuleBased`/`Hybrid`)
/// fall back to `automatic`.
pub fn ml_guided(
    entries: &[ConflictingData],
    recommended: ResolutionStrategy,
    ranking: &HashMap<String, i32>,
    additive_fields: &[String],
) -> Resolution {
    let mut resolution = match recommended {
        ResolutionStrategy::Consensus => consensus(entries),
        ResolutionStrategy::Priority => priority(entries, ranking),
        ResolutionStrategy::Merge => merge(entries, additive_fields),
        ResolutionStrategy::Temporal => temporal(entries),
        ResolutionStrategy::Automatic
        | ResolutionStrategy::Manual
        | ResolutionStrategy::MlGuided
        | ResolutionStrategy::RuleBased
        | ResolutionStrategy::Hybrid => automatic(entries),
    };
    if !resolution.involved_strategies.contains(&ResolutionStrategy::MlGuided) {
        resolution.involved_strategies.push(ResolutionStrategy::MlGuided);
    }
    resolution.reasoning = format!("ml-guided ({recommended:?} recommended): {}", resolution.reasoning);
    resolution
}

/// Runs {automatic, rule_based (if a rule applies), temporal} and returns
/// the highest-confidence outcome, recording which strategies were tried
/// (spec.md §4.11).
pub fn hybrid(
    entries: &[ConflictingData],
    rule_based_result: Option<Resolution>,
) -> Resolution {
    let mut candidates = vec![automatic(entries), temporal(entries)];
    if let Some(rule_result) = rule_based_result {
        candidates.push(rule_result);
    }
    let tried: Vec<ResolutionStrategy> = candidates
        .iter()
        .flat_map(|c| c.involved_strategies.iter().copied())
        .collect();
    let mut best = candidates
        .into_iter()
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
        .expect("at least automatic and temporal are always present");
    best.involved_strategies = tried;
    best.reasoning = format!("hybrid: {}", best.reasoning);
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn entry(agent: &str, value: serde_json::Value, confidence: f32, offset_secs: i64) -> ConflictingData {
        ConflictingData {
            agent_id: agent.to_string(),
            data: value,
            version: 1,
            timestamp: Utc::now() + chrono::Duration::seconds(offset_secs),
            confidence,
            checksum: "c".to_string(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn automatic_picks_highest_confidence() {
        let entries = vec![
            entry("a", json!({"v": 1}), 0.4, 0),
            entry("b", json!({"v": 2}), 0.9, 0),
        ];
        let resolution = automatic(&entries);
        assert_eq!(resolution.resolved_data, json!({"v": 2}));
    }

    #[test]
    fn consensus_breaks_ties_by_confidence() {
        let entries = vec![
            entry("a", json!({"v": 1}), 0.3, 0),
            entry("b", json!({"v": 2}), 0.9, 0),
        ];
        let resolution = consensus(&entries);
        assert_eq!(resolution.resolved_data, json!({"v": 2}));
    }

    #[test]
    fn temporal_picks_latest() {
        let entries = vec![
            entry("a", json!({"v": 1}), 0.9, -10),
            entry("b", json!({"v": 2}), 0.1, 0),
        ];
        let resolution = temporal(&entries);
        assert_eq!(resolution.resolved_data, json!({"v": 2}));
    }

    #[test]
    fn merge_unions_fields_additively() {
        let entries = vec![
            entry("a", json!({"tags": ["x"]}), 0.5, -5),
            entry("b", json!({"tags": ["y"]}), 0.5, 0),
        ];
        let resolution = merge(&entries, &["tags".to_string()]);
        assert_eq!(resolution.resolved_data, json!({"tags": ["x", "y"]}));
    }

    #[test]
    fn ml_guided_dispatches_to_the_recommended_strategy() {
        let entries = vec![
            entry("a", json!({"v": 1}), 0.9, -120),
            entry("b", json!({"v": 2}), 0.1, 0),
        ];
        let resolution = ml_guided(&entries, ResolutionStrategy::Temporal, &HashMap::new(), &[]);
        assert_eq!(resolution.resolved_data, json!({"v": 2}));
        assert!(resolution.involved_strategies.contains(&ResolutionStrategy::Temporal));
        assert!(resolution.involved_strategies.contains(&ResolutionStrategy::MlGuided));
    }

    #[test]
    fn ml_guided_falls_back_to_automatic_for_a_strategy_it_should_not_recurse_into() {
        let entries = vec![
            entry("a", json!({"v": 1}), 0.4, 0),
            entry("b", json!({"v": 2}), 0.9, 0),
        ];
        let resolution = ml_guided(&entries, ResolutionStrategy::Manual, &HashMap::new(), &[]);
        assert_eq!(resolution.resolved_data, json!({"v": 2}));
    }
}
