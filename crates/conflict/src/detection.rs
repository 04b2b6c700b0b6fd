use agentmem_model::{ConflictType, ConflictingData};

/// Classifies two versions of the same logical item in priority order
/// (spec.md §4.11). `None` means no conflict (identical checksums).
/// `semantic_classifier` stands in for "an ML classifier enabled and flags
/// meaning-divergence"; pass `None` to always fall back to `data_conflict`.
pub fn detect(
    a: &ConflictingData,
    b: &ConflictingData,
    semantic_classifier: Option<&dyn Fn(&ConflictingData, &ConflictingData) -> bool>,
) -> Option<ConflictType> {
    if a.checksum == b.checksum {
        return None;
    }

    if a.version != b.version {
        return Some(ConflictType::VersionConflict);
    }

    let elapsed = (a.timestamp - b.timestamp).num_seconds().unsigned_abs();
    if elapsed > 60 {
        return Some(ConflictType::TimestampConflict);
    }

    if schema_shape(&a.data) != schema_shape(&b.data) {
        return Some(ConflictType::StructureConflict);
    }

    if a.data != b.data {
        if let Some(classifier) = semantic_classifier {
            if classifier(a, b) {
                return Some(ConflictType::SemanticConflict);
            }
        }
        return Some(ConflictType::DataConflict);
    }

    if permission_diverges(a, b) {
        return Some(ConflictType::PermissionConflict);
    }

    None
}

/// True when the two entries agree on `data` but disagree on the
/// `permission` key of their metadata (spec.md §4.11: "metadata permission
/// divergence → permission_conflict").
fn permission_diverges(a: &ConflictingData, b: &ConflictingData) -> bool {
    a.metadata.get("permission") != b.metadata.get("permission")
}

/// A coarse structural fingerprint: object key set, or a type tag for
/// non-object values. Two values with the same shape but different content
/// fall through to `data_conflict` instead of `structure_conflict`.
fn schema_shape(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            keys
        }
        other => vec![type_tag(other).to_string()],
    }
}

fn type_tag(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn data(version: u64, timestamp_offset_secs: i64, value: serde_json::Value) -> ConflictingData {
        ConflictingData {
            agent_id: "agent".to_string(),
            data: value,
            version,
            timestamp: Utc::now() + chrono::Duration::seconds(timestamp_offset_secs),
            confidence: 0.8,
            checksum: "irrelevant".to_string(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn identical_checksums_yield_no_conflict() {
        let mut a = data(1, 0, json!({"a": 1}));
        let mut b = data(1, 0, json!({"a": 1}));
        a.checksum = "same".to_string();
        b.checksum = "same".to_string();
        assert_eq!(detect(&a, &b, None), None);
    }

    #[test]
    fn version_mismatch_takes_priority() {
        let a = data(1, 0, json!({"a": 1}));
        let b = data(2, 0, json!({"a": 1}));
        assert_eq!(detect(&a, &b, None), Some(ConflictType::VersionConflict));
    }

    #[test]
    fn same_version_large_time_gap_is_timestamp_conflict() {
        let a = data(1, 0, json!({"a": 1}));
        let b = data(1, 120, json!({"a": 1}));
        assert_eq!(detect(&a, &b, None), Some(ConflictType::TimestampConflict));
    }

    #[test]
    fn differing_shape_is_structure_conflict() {
        let a = data(1, 0, json!({"a": 1}));
        let b = data(1, 0, json!({"b": 1}));
        assert_eq!(detect(&a, &b, None), Some(ConflictType::StructureConflict));
    }

    #[test]
    fn differing_content_same_shape_is_data_conflict() {
        let a = data(1, 0, json!({"a": 1}));
        let b = data(1, 0, json!({"a": 2}));
        assert_eq!(detect(&a, &b, None), Some(ConflictType::DataConflict));
    }

    #[test]
    fn semantic_classifier_overrides_data_conflict() {
        let a = data(1, 0, json!({"a": 1}));
        let b = data(1, 0, json!({"a": 2}));
        let classifier: &dyn Fn(&ConflictingData, &ConflictingData) -> bool = &|_, _| true;
        assert_eq!(
            detect(&a, &b, Some(classifier)),
            Some(ConflictType::SemanticConflict)
        );
    }

    #[test]
    fn same_data_diverging_permission_metadata_is_permission_conflict() {
        let mut a = data(1, 0, json!({"a": 1}));
        let mut b = data(1, 0, json!({"a": 1}));
        a.metadata.insert("permission".to_string(), json!("read"));
        b.metadata.insert("permission".to_string(), json!("write"));
        assert_eq!(detect(&a, &b, None), Some(ConflictType::PermissionConflict));
    }

    #[test]
    fn same_data_same_permission_metadata_is_no_conflict() {
        let mut a = data(1, 0, json!({"a": 1}));
        let mut b = data(1, 0, json!({"a": 1}));
        a.metadata.insert("permission".to_string(), json!("read"));
        b.metadata.insert("permission".to_string(), json!("read"));
        assert_eq!(detect(&a, &b, None), None);
    }
}
