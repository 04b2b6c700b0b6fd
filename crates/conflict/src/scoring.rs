use agentmem_model::{ConflictPriority, ConflictType};

/// `base(type) + 2*|confidence_diff| + 2*(age_diff > 1 day) +
/// 3*(context.critical)` (spec.md §4.11).
pub fn priority_score(
    conflict_type: ConflictType,
    confidence_diff: f32,
    age_diff: chrono::Duration,
    critical: bool,
) -> f32 {
    let mut score = conflict_type.base_score() as f32;
    score += 2.0 * confidence_diff.abs();
    if age_diff > chrono::Duration::days(1) {
        score += 2.0;
    }
    if critical {
        score += 3.0;
    }
    score
}

pub fn bucketise(score: f32) -> ConflictPriority {
    ConflictPriority::from_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_context_pushes_into_emergency() {
        let score = priority_score(
            ConflictType::PermissionConflict,
            0.5,
            chrono::Duration::days(2),
            true,
        );
        assert_eq!(bucketise(score), ConflictPriority::Emergency);
    }

    #[test]
    fn low_confidence_diff_short_age_stays_low_or_medium() {
        let score = priority_score(ConflictType::TimestampConflict, 0.0, chrono::Duration::seconds(5), false);
        assert_eq!(bucketise(score), ConflictPriority::Low);
    }
}
