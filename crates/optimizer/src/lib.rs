pub mod autonomous;
pub mod cache;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod stats;

pub use autonomous::{
    AutonomousOptimizer, ExecutionOutcome, OptimizationAction, OptimizationRule,
    PerformanceContext, RuleMetadata, Sampler, SelfReportingSampler,
};
pub use cache::TtlCache;
pub use config::OptimizerConfig;
pub use error::OptimizerError;
pub use optimizer::Optimizer;
pub use stats::{estimate_size_bytes, MemoryStats};
