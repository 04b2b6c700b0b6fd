pub mod error;
pub mod manager;

pub use error::RelationshipError;
pub use manager::{Graph, GraphStats, HierarchyNode, RelationshipManager, SuggestedRelationship};
