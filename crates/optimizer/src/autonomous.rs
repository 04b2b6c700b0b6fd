use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sampled performance/load snapshot fed into rule conditions (spec.md
/// §4.12). There is no real telemetry backend in scope, so this is either
/// supplied directly by the caller or produced by a trivial self-reporting
/// `Sampler` (recorded as an Open Question resolution in DESIGN.md).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceContext {
    pub query_latency_ms: f64,
    pub memory_usage_bytes: u64,
    pub cache_hit_rate: f32,
    pub error_rate: f32,
    pub system_load: f32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Trivial sampler used when no richer telemetry source is wired in. A real
/// deployment would implement `Sampler` against its metrics backend.
pub trait Sampler: Send + Sync {
    fn sample(&self) -> PerformanceContext;
}

#[derive(Debug, Default)]
pub struct SelfReportingSampler;

impl Sampler for SelfReportingSampler {
    fn sample(&self) -> PerformanceContext {
        let now = Utc::now();
        PerformanceContext {
            query_latency_ms: 0.0,
            memory_usage_bytes: 0,
            cache_hit_rate: 1.0,
            error_rate: 0.0,
            system_load: 0.0,
            window_start: now,
            window_end: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationAction {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub category: String,
    pub impact: f32,
    pub risk: f32,
}

/// A rule `{id, condition, action, priority, enabled, metadata}` (spec.md
/// §4.12). `condition`/`action` are plain function pointers rather than
/// boxed closures so rules stay cheap to construct and `Clone`.
#[derive(Clone)]
pub struct OptimizationRule {
    pub id: String,
    pub condition: fn(&PerformanceContext) -> bool,
    pub action: fn(&PerformanceContext) -> OptimizationAction,
    pub priority: i32,
    pub enabled: bool,
    pub metadata: RuleMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub strategy: String,
    pub success: bool,
    pub duration: Duration,
    pub impact: f32,
}

/// Holds the rule table and learned per-strategy confidence (spec.md
/// §4.12).
pub struct AutonomousOptimizer {
    rules: Vec<OptimizationRule>,
    max_actions_per_cycle: usize,
    confidence: HashMap<String, f32>,
}

impl AutonomousOptimizer {
    pub fn new(rules: Vec<OptimizationRule>, max_actions_per_cycle: usize) -> Self {
        Self {
            rules,
            max_actions_per_cycle,
            confidence: HashMap::new(),
        }
    }

    pub fn gather_context(&self, sampler: &dyn Sampler) -> PerformanceContext {
        sampler.sample()
    }

    /// Enabled rules whose condition holds, sorted by priority descending,
    /// limited to `max_actions_per_cycle` (spec.md §4.12).
    pub fn identify(&self, context: &PerformanceContext) -> Vec<&OptimizationRule> {
        let mut matched: Vec<&OptimizationRule> = self
            .rules
            .iter()
            .filter(|rule| rule.enabled && (rule.condition)(context))
            .collect();
        matched.sort_by(|a, b| b.priority.cmp(&a.priority));
        matched.truncate(self.max_actions_per_cycle);
        matched
    }

    /// Runs the action produced by the named rule's `action` fn and reports
    /// an outcome. Actual "execution" here is the action description itself
    /// (there is no process to drive beyond the optimiser pipeline, which is
    /// invoked separately); `impact` is read from the rule's metadata.
    pub fn execute_strategy(
        &self,
        rule: &OptimizationRule,
        context: &PerformanceContext,
    ) -> ExecutionOutcome {
        let started = std::time::Instant::now();
        let action = (rule.action)(context);
        tracing::info!(strategy = %action.name, "autonomous optimiser executing strategy");
        ExecutionOutcome {
            strategy: action.name,
            success: true,
            duration: started.elapsed(),
            impact: rule.metadata.impact,
        }
    }

    /// Adjusts a scalar confidence in `[-0.2, 0.2]` per strategy and
    /// promotes high-impact strategies by nudging their rule's priority up
    /// (spec.md §4.12).
    pub fn learn_from_outcomes(&mut self, outcomes: &[ExecutionOutcome]) {
        for outcome in outcomes {
            let entry = self.confidence.entry(outcome.strategy.clone()).or_insert(0.0);
            let delta = if outcome.success {
                outcome.impact * 0.1
            } else {
                -0.1
            };
            *entry = (*entry + delta).clamp(-0.2, 0.2);

            if outcome.success && outcome.impact >= 0.7 {
                if let Some(rule) = self
                    .rules
                    .iter_mut()
                    .find(|r| (r.action)(&sample_for_lookup()).name == outcome.strategy)
                {
                    rule.priority += 1;
                }
            }
        }
    }

    pub fn confidence_for(&self, strategy: &str) -> f32 {
        self.confidence.get(strategy).copied().unwrap_or(0.0)
    }
}

/// Neutral context used only to resolve a rule's stable action name when
/// promoting strategies; action names must not depend on the sampled
/// values, which holds for every rule in this workspace's default table.
fn sample_for_lookup() -> PerformanceContext {
    let now = Utc::now();
    PerformanceContext {
        query_latency_ms: 0.0,
        memory_usage_bytes: 0,
        cache_hit_rate: 1.0,
        error_rate: 0.0,
        system_load: 0.0,
        window_start: now,
        window_end: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slow_query_condition(ctx: &PerformanceContext) -> bool {
        ctx.query_latency_ms > 500.0
    }

    fn slow_query_action(_ctx: &PerformanceContext) -> OptimizationAction {
        OptimizationAction {
            name: "increase_cache_ttl".to_string(),
            description: "raise the result cache TTL to absorb repeated slow queries".to_string(),
        }
    }

    fn rule() -> OptimizationRule {
        OptimizationRule {
            id: "slow-query".to_string(),
            condition: slow_query_condition,
            action: slow_query_action,
            priority: 5,
            enabled: true,
            metadata: RuleMetadata {
                category: "latency".to_string(),
                impact: 0.8,
                risk: 0.1,
            },
        }
    }

    fn context(latency_ms: f64) -> PerformanceContext {
        let now = Utc::now();
        PerformanceContext {
            query_latency_ms: latency_ms,
            memory_usage_bytes: 0,
            cache_hit_rate: 0.5,
            error_rate: 0.0,
            system_load: 0.1,
            window_start: now,
            window_end: now,
        }
    }

    #[test]
    fn identify_returns_only_matching_enabled_rules() {
        let optimizer = AutonomousOptimizer::new(vec![rule()], 10);
        assert!(optimizer.identify(&context(100.0)).is_empty());
        assert_eq!(optimizer.identify(&context(900.0)).len(), 1);
    }

    #[test]
    fn identify_respects_max_actions_per_cycle() {
        let mut r2 = rule();
        r2.id = "slow-query-2".to_string();
        let optimizer = AutonomousOptimizer::new(vec![rule(), r2], 1);
        assert_eq!(optimizer.identify(&context(900.0)).len(), 1);
    }

    #[test]
    fn learn_from_outcomes_adjusts_confidence_within_bounds() {
        let mut optimizer = AutonomousOptimizer::new(vec![rule()], 10);
        let outcome = ExecutionOutcome {
            strategy: "increase_cache_ttl".to_string(),
            success: true,
            duration: Duration::from_millis(1),
            impact: 0.8,
        };
        optimizer.learn_from_outcomes(&[outcome]);
        let confidence = optimizer.confidence_for("increase_cache_ttl");
        assert!(confidence > 0.0 && confidence <= 0.2);
    }
}
