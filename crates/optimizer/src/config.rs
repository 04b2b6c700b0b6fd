/// Thresholds driving the optimiser pipeline (spec.md §4.8). Not part of
/// `agentmem-config`'s five validated sections — these are optimiser-owned
/// knobs, analogous to how the teacher's `aigent-memory` sleep-cycle
/// thresholds live alongside the memory manager rather than in
/// `AppConfig`.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub max_memory_age_days: i64,
    pub low_access_threshold: u64,
    pub low_access_max_age_days: i64,
    pub cleanup_interval_hours: u64,
    pub cache_capacity: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_memory_age_days: 180,
            low_access_threshold: 2,
            low_access_max_age_days: 30,
            cleanup_interval_hours: 6,
            cache_capacity: 256,
        }
    }
}
