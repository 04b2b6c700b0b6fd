use std::collections::HashMap;

use agentmem_model::{ConflictType, ResolutionStrategy};
use serde::{Deserialize, Serialize};

/// Aggregate counters surfaced by `ConflictResolver::stats` (spec.md
/// §4.11).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictMetrics {
    pub total_detected: u64,
    pub total_resolved: u64,
    pub total_escalated: u64,
    pub strategy_effectiveness: HashMap<ResolutionStrategy, StrategyTally>,
    pub type_distribution: HashMap<ConflictType, u64>,
    pub per_agent_conflicts: HashMap<String, u64>,
    pub pattern_match_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyTally {
    pub attempts: u64,
    pub successes: u64,
}

impl StrategyTally {
    pub fn success_rate(&self) -> f32 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f32 / self.attempts as f32
        }
    }
}

impl ConflictMetrics {
    pub fn resolution_success_rate(&self) -> f32 {
        if self.total_detected == 0 {
            0.0
        } else {
            self.total_resolved as f32 / self.total_detected as f32
        }
    }

    pub fn record_detected(&mut self, conflict_type: ConflictType, agents: &[String]) {
        self.total_detected += 1;
        *self.type_distribution.entry(conflict_type).or_insert(0) += 1;
        for agent in agents {
            *self.per_agent_conflicts.entry(agent.clone()).or_insert(0) += 1;
        }
    }

    pub fn record_resolution(&mut self, strategy: ResolutionStrategy, succeeded: bool) {
        let tally = self.strategy_effectiveness.entry(strategy).or_default();
        tally.attempts += 1;
        if succeeded {
            tally.successes += 1;
            self.total_resolved += 1;
        }
    }

    pub fn record_escalated(&mut self) {
        self.total_escalated += 1;
    }

    pub fn record_pattern_match(&mut self) {
        self.pattern_match_count += 1;
    }
}
