pub mod conflict;
pub mod filter;
pub mod record;
pub mod relationship;
pub mod sharing;

pub use conflict::{
    Approval, ApprovalResponse, Conflict, ConflictMetadata, ConflictPriority, ConflictStatus,
    ConflictType, ConflictingData, Resolution, ResolutionStrategy,
};
pub use filter::{StorageFilter, VectorQuery, VectorResult};
pub use record::{MemoryRecord, MemoryType, ModelError, RecordPatch};
pub use relationship::{Relationship, RelationshipType};
pub use sharing::{
    AccessAction, AccessRecord, Permissions, Replica, ReplicaStatus, SharedMemory, SyncStatus,
};
