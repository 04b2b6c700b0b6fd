//! Classifier & Importance Scorer (spec.md §4.5): pure, deterministic,
//! regex-based rules. No I/O, no async — every call is a plain function of
//! its input text.

use std::sync::LazyLock;

use regex::RegexSet;

use agentmem_model::MemoryType;

/// Priority order is authoritative (spec.md §4.5): the first matching rule
/// wins. Content matching none of these falls back to `Thread`.
static EMOTION: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bi feel\b",
        r"(?i)\bi('m| am) (happy|sad|angry|anxious|excited|frustrated|scared|worried)\b",
        r"(?i)\b(love|hate) (it|this|that|you)\b",
        r"(?i)\bemotion(al|s)?\b",
    ])
    .expect("static emotion pattern set is valid")
});

static TASK: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\btodo\b",
        r"(?i)\bdeadline\b",
        r"(?i)\bdue (by|on|date)\b",
        r"(?i)\bremind(er)?\b",
        r"(?i)\bschedule(d)?\b",
        r"(?i)\b(tomorrow|today) (at|by)\b",
        r"(?i)\bappointment\b",
        r"(?i)\bmeeting at\b",
    ])
    .expect("static task pattern set is valid")
});

static PERSONALITY: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bi('m| am) (an?|the) (introvert|extrovert|optimist|pessimist)\b",
        r"(?i)\bmy personality\b",
        r"(?i)\bi tend to\b",
        r"(?i)\bi always\b",
        r"(?i)\bi'm the (kind|type) of person\b",
    ])
    .expect("static personality pattern set is valid")
});

static THREAD: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bfollowing up\b",
        r"(?i)\bcontinuing (our|the) (conversation|discussion)\b",
        r"(?i)\bas (we|i) (discussed|mentioned) (earlier|previously|before)\b",
        r"(?i)\bthread\b",
    ])
    .expect("static thread pattern set is valid")
});

static PREFERENCE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bi (prefer|like|enjoy|dislike|love|hate) \b",
        r"(?i)\bmy favorite\b",
        r"(?i)\bfavourite\b",
    ])
    .expect("static preference pattern set is valid")
});

static PROCEDURE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bhow to\b",
        r"(?i)\bstep(s)? (1|one|to)\b",
        r"(?i)\bfirst,? (then|second)\b",
        r"(?i)\bprocedure (for|to)\b",
        r"(?i)\binstructions?\b",
    ])
    .expect("static procedure pattern set is valid")
});

static FACT: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([r"(?i)\bfact:\b", r"(?i)\bis (located|known|defined) (in|as)\b"])
        .expect("static fact pattern set is valid")
});

/// Classifies free text per the ordered priority rules; falls back to
/// `Thread` when nothing matches.
pub fn classify(content: &str) -> MemoryType {
    if EMOTION.is_match(content) {
        MemoryType::Emotion
    } else if TASK.is_match(content) {
        MemoryType::Task
    } else if PERSONALITY.is_match(content) {
        MemoryType::Personality
    } else if THREAD.is_match(content) {
        MemoryType::Thread
    } else if PREFERENCE.is_match(content) {
        MemoryType::Preference
    } else if PROCEDURE.is_match(content) {
        MemoryType::Procedure
    } else if FACT.is_match(content) {
        MemoryType::Fact
    } else {
        MemoryType::Thread
    }
}

static HIGH_IMPORTANCE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bsecret\b",
        r"(?i)\bcritical\b",
        r"(?i)\burgent\b",
        r"(?i)\bdeadline\b",
    ])
    .expect("static high-importance pattern set is valid")
});

static MEDIUM_IMPORTANCE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bimportant\b",
        r"(?i)\bpriority\b",
        r"(?i)\bsignificant\b",
        r"(?i)\bmajor\b",
    ])
    .expect("static medium-importance pattern set is valid")
});

static CASUAL: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([r"(?i)\blol\b", r"(?i)\bhaha\b", r"(?i)\bwhatever\b", r"(?i)\bjust chatting\b"])
        .expect("static casual pattern set is valid")
});

/// Base 0.4; see spec.md §4.5 for the additive rules. Medium and casual
/// keyword sets are this crate's own choice (not spelled out in the
/// specification) and are recorded as such in the design notes.
pub fn importance(content: &str) -> f32 {
    let mut score: f32 = 0.4;
    if HIGH_IMPORTANCE.is_match(content) {
        score += 0.3;
    }
    if MEDIUM_IMPORTANCE.is_match(content) {
        score += 0.2;
    }
    if content.len() > 200 {
        score += 0.1;
    }
    if CASUAL.is_match(content) {
        score -= 0.05;
    }
    score.clamp(0.1, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_preference() {
        assert_eq!(classify("I prefer dark mode"), MemoryType::Preference);
    }

    #[test]
    fn classifies_emotion_over_preference() {
        assert_eq!(
            classify("I feel happy that I prefer dark mode"),
            MemoryType::Emotion
        );
    }

    #[test]
    fn classifies_task_over_personality() {
        assert_eq!(
            classify("deadline: I tend to procrastinate"),
            MemoryType::Task
        );
    }

    #[test]
    fn unmatched_content_defaults_to_thread() {
        assert_eq!(classify("the sky is blue today"), MemoryType::Thread);
    }

    #[test]
    fn importance_base_is_point_four() {
        assert!((importance("just a normal sentence") - 0.4).abs() < 1e-6);
    }

    #[test]
    fn importance_adds_for_high_keyword() {
        let score = importance("this is a secret plan");
        assert!((score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn importance_clamps_at_one_when_multiple_bonuses_stack() {
        let long_important_secret = format!(
            "this is a secret and important matter. {}",
            "padding ".repeat(40)
        );
        let score = importance(&long_important_secret);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn importance_never_drops_below_minimum() {
        let score = importance("lol whatever haha");
        assert!(score >= 0.1);
    }
}
