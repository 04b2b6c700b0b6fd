//! Memory Engine (spec.md §4.6) and Tier Detector / Unified Engine
//! (spec.md §4.7): orchestrates classify -> embed -> store/search, then
//! routes every public operation through whichever capability tier is
//! currently active, falling back on failure.

pub mod engine;
pub mod error;
pub mod health;
pub mod keyword;
pub mod ops;
pub mod options;
pub mod tier;
pub mod unified;

pub use engine::MemoryEngine;
pub use error::EngineError;
pub use health::{ComponentHealth, EngineHealth, HealthStatus};
pub use keyword::KeywordEngine;
pub use ops::EngineOps;
pub use options::{summarize, ContextRequest, ContextResult, RecallOptions, RememberOptions};
pub use tier::{Capabilities, Tier, TierDetector};
pub use unified::{EngineStats, UnifiedEngine};
