use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use tokio::sync::RwLock;

use agentmem_model::{Relationship, RelationshipType};

use crate::error::RelationshipError;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub max_depth: usize,
    pub average_connectivity: f32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Graph {
    pub nodes: Vec<String>,
    pub edges: Vec<Relationship>,
    pub paths: Vec<Vec<String>>,
    pub stats: GraphStats,
}

/// A candidate edge `suggest` has not yet created (spec.md §6 supplement).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SuggestedRelationship {
    pub source_memory_id: String,
    pub target_memory_id: String,
    pub relationship_type: RelationshipType,
    pub strength: f32,
    pub reason: String,
}

/// One node of a parent/child tree rooted at the id `hierarchy` was called
/// with.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HierarchyNode {
    pub memory_id: String,
    pub children: Vec<HierarchyNode>,
}

fn node_key(memory_id: &str, tenant_id: &str) -> (String, String) {
    (memory_id.to_string(), tenant_id.to_string())
}

/// In-memory directed multigraph of typed edges between memories, keyed by
/// `(endpoint_id, tenant_id)` (spec.md §4.9). Every relationship is stored
/// once in `relationships` and indexed from both of its endpoints in
/// `adjacency`.
#[derive(Default)]
pub struct RelationshipManager {
    relationships: RwLock<HashMap<String, Relationship>>,
    adjacency: RwLock<HashMap<(String, String), Vec<String>>>,
}

impl RelationshipManager {
    pub fn new() -> Self {
        Self::default()
    }

    async fn index(&self, relationship: &Relationship) {
        let mut adjacency = self.adjacency.write().await;
        adjacency
            .entry(node_key(&relationship.source_memory_id, &relationship.tenant_id))
            .or_default()
            .push(relationship.id.clone());
        adjacency
            .entry(node_key(&relationship.target_memory_id, &relationship.tenant_id))
            .or_default()
            .push(relationship.id.clone());
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        source_memory_id: &str,
        target_memory_id: &str,
        relationship_type: RelationshipType,
        strength: f32,
    ) -> Result<Relationship, RelationshipError> {
        if source_memory_id == target_memory_id {
            return Err(RelationshipError::SelfReference);
        }
        let relationship = Relationship::new(
            tenant_id,
            source_memory_id,
            target_memory_id,
            relationship_type,
            strength,
            Utc::now(),
        );
        self.index(&relationship).await;
        self.relationships
            .write()
            .await
            .insert(relationship.id.clone(), relationship.clone());
        Ok(relationship)
    }

    pub async fn get(&self, id: &str) -> Option<Relationship> {
        self.relationships.read().await.get(id).cloned()
    }

    pub async fn delete(&self, id: &str) -> Result<(), RelationshipError> {
        let relationship = self
            .relationships
            .write()
            .await
            .remove(id)
            .ok_or_else(|| RelationshipError::NotFound(id.to_string()))?;
        let mut adjacency = self.adjacency.write().await;
        for key in [
            node_key(&relationship.source_memory_id, &relationship.tenant_id),
            node_key(&relationship.target_memory_id, &relationship.tenant_id),
        ] {
            if let Some(ids) = adjacency.get_mut(&key) {
                ids.retain(|existing| existing != id);
            }
        }
        Ok(())
    }

    /// Counterpart ids for active relationships of `types` touching `id`
    /// (spec.md §4.9). Empty `types` matches every type.
    pub async fn find_related(
        &self,
        id: &str,
        types: &[RelationshipType],
        tenant_id: &str,
    ) -> HashSet<String> {
        let adjacency = self.adjacency.read().await;
        let relationships = self.relationships.read().await;
        let Some(ids) = adjacency.get(&node_key(id, tenant_id)) else {
            return HashSet::new();
        };
        ids.iter()
            .filter_map(|rel_id| relationships.get(rel_id))
            .filter(|r| r.is_active)
            .filter(|r| types.is_empty() || types.contains(&r.relationship_type))
            .map(|r| {
                if r.source_memory_id == id {
                    r.target_memory_id.clone()
                } else {
                    r.source_memory_id.clone()
                }
            })
            .collect()
    }

    /// BFS from `start` up to `max_depth` hops, emitting deduped edges, the
    /// visited node list, enumerated simple paths to every reached node, and
    /// aggregate stats (spec.md §4.9).
    pub async fn build_graph(
        &self,
        start: &str,
        max_depth: usize,
        types: &[RelationshipType],
        include_inactive: bool,
        tenant_id: &str,
    ) -> Graph {
        let adjacency = self.adjacency.read().await;
        let relationships = self.relationships.read().await;

        let mut visited: HashSet<String> = HashSet::from([start.to_string()]);
        let mut nodes: Vec<String> = vec![start.to_string()];
        let mut edge_ids: Vec<String> = Vec::new();
        let mut seen_edges: HashSet<String> = HashSet::new();
        let mut paths: Vec<Vec<String>> = Vec::new();
        let mut queue: VecDeque<(String, usize, Vec<String>)> =
            VecDeque::from([(start.to_string(), 0, vec![start.to_string()])]);

        while let Some((current, depth, path)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(ids) = adjacency.get(&node_key(&current, tenant_id)) else {
                continue;
            };
            for rel_id in ids {
                let Some(relationship) = relationships.get(rel_id) else {
                    continue;
                };
                if !include_inactive && !relationship.is_active {
                    continue;
                }
                if !types.is_empty() && !types.contains(&relationship.relationship_type) {
                    continue;
                }
                let counterpart = if relationship.source_memory_id == current {
                    &relationship.target_memory_id
                } else {
                    &relationship.source_memory_id
                };

                if seen_edges.insert(relationship.id.clone()) {
                    edge_ids.push(relationship.id.clone());
                }

                if visited.insert(counterpart.clone()) {
                    nodes.push(counterpart.clone());
                    let mut next_path = path.clone();
                    next_path.push(counterpart.clone());
                    paths.push(next_path.clone());
                    queue.push_back((counterpart.clone(), depth + 1, next_path));
                }
            }
        }

        let edges: Vec<Relationship> = edge_ids
            .into_iter()
            .filter_map(|id| relationships.get(&id).cloned())
            .collect();

        let total_nodes = nodes.len();
        let total_edges = edges.len();
        let average_connectivity = if total_nodes == 0 {
            0.0
        } else {
            total_edges as f32 / total_nodes as f32
        };

        Graph {
            nodes,
            edges,
            paths,
            stats: GraphStats {
                total_nodes,
                total_edges,
                max_depth,
                average_connectivity,
            },
        }
    }

    /// Active relationships of type `conflicts` touching `id` (spec.md §6
    /// supplement; same shape as `find_related` but returning the full edges
    /// rather than just counterpart ids, since a conflict caller needs the
    /// edge's `strength`/`id` to act on it).
    pub async fn find_conflicts(&self, id: &str, tenant_id: &str) -> Vec<Relationship> {
        let adjacency = self.adjacency.read().await;
        let relationships = self.relationships.read().await;
        let Some(ids) = adjacency.get(&node_key(id, tenant_id)) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|rel_id| relationships.get(rel_id))
            .filter(|r| r.is_active && r.relationship_type == RelationshipType::Conflicts)
            .cloned()
            .collect()
    }

    /// Ranks `candidates` (memory id, similarity score in `[0, 1]`) not
    /// already linked to `memory_id` by an active edge, keeping only those
    /// at or above `similarity_threshold` and suggesting a `references` edge
    /// (spec.md §6 supplement — content-similarity is computed upstream by
    /// the caller, e.g. via embedding cosine distance; this crate has no
    /// embedding dependency of its own).
    pub async fn suggest(
        &self,
        memory_id: &str,
        candidates: &[(String, f32)],
        similarity_threshold: f32,
        tenant_id: &str,
    ) -> Vec<SuggestedRelationship> {
        let already_related = self.find_related(memory_id, &[], tenant_id).await;
        let mut suggestions: Vec<SuggestedRelationship> = candidates
            .iter()
            .filter(|(candidate_id, score)| {
                candidate_id != memory_id
                    && *score >= similarity_threshold
                    && !already_related.contains(candidate_id)
            })
            .map(|(candidate_id, score)| SuggestedRelationship {
                source_memory_id: memory_id.to_string(),
                target_memory_id: candidate_id.clone(),
                relationship_type: RelationshipType::References,
                strength: *score,
                reason: format!("content similarity {score:.2}"),
            })
            .collect();
        suggestions.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));
        suggestions
    }

    /// Walks `parent`-typed edges down from `root_id`, building the subtree
    /// of its descendants (spec.md §6 supplement). Cycles (which `create`
    /// does not prevent) are broken by a visited set, so a node already seen
    /// on this path is not descended into again.
    pub async fn hierarchy(&self, root_id: &str, tenant_id: &str) -> HierarchyNode {
        let adjacency = self.adjacency.read().await;
        let relationships = self.relationships.read().await;
        let mut visited = HashSet::from([root_id.to_string()]);
        Self::hierarchy_node(root_id, tenant_id, &adjacency, &relationships, &mut visited)
    }

    fn hierarchy_node(
        memory_id: &str,
        tenant_id: &str,
        adjacency: &HashMap<(String, String), Vec<String>>,
        relationships: &HashMap<String, Relationship>,
        visited: &mut HashSet<String>,
    ) -> HierarchyNode {
        let children: Vec<HierarchyNode> = adjacency
            .get(&node_key(memory_id, tenant_id))
            .into_iter()
            .flatten()
            .filter_map(|rel_id| relationships.get(rel_id))
            .filter(|r| {
                r.is_active && r.relationship_type == RelationshipType::Parent && r.source_memory_id == memory_id
            })
            .filter(|r| visited.insert(r.target_memory_id.clone()))
            .map(|r| Self::hierarchy_node(&r.target_memory_id, tenant_id, adjacency, relationships, visited))
            .collect();
        HierarchyNode { memory_id: memory_id.to_string(), children }
    }

    /// Creates `parent --(parent)--> child` and `child --(child)--> parent`
    /// (spec.md §4.9).
    pub async fn link_parent_child(
        &self,
        tenant_id: &str,
        parent_id: &str,
        child_id: &str,
        strength: f32,
    ) -> Result<(Relationship, Relationship), RelationshipError> {
        let parent_to_child = self
            .create(tenant_id, parent_id, child_id, RelationshipType::Parent, strength)
            .await?;
        let child_to_parent = self
            .create(tenant_id, child_id, parent_id, RelationshipType::Child, strength)
            .await?;
        Ok((parent_to_child, child_to_parent))
    }

    /// Creates a symmetric pair of `sibling` edges (spec.md §4.9).
    pub async fn link_siblings(
        &self,
        tenant_id: &str,
        a_id: &str,
        b_id: &str,
        strength: f32,
    ) -> Result<(Relationship, Relationship), RelationshipError> {
        let a_to_b = self
            .create(tenant_id, a_id, b_id, RelationshipType::Sibling, strength)
            .await?;
        let b_to_a = self
            .create(tenant_id, b_id, a_id, RelationshipType::Sibling, strength)
            .await?;
        Ok((a_to_b, b_to_a))
    }

    /// Deletes every relationship with an endpoint missing from `valid_ids`,
    /// counting each orphaned relationship exactly once (spec.md §4.9).
    pub async fn cleanup_orphaned(&self, valid_ids: &HashSet<String>, tenant_id: &str) -> usize {
        let orphaned: Vec<String> = {
            let relationships = self.relationships.read().await;
            relationships
                .values()
                .filter(|r| r.tenant_id == tenant_id)
                .filter(|r| {
                    !valid_ids.contains(&r.source_memory_id)
                        || !valid_ids.contains(&r.target_memory_id)
                })
                .map(|r| r.id.clone())
                .collect()
        };
        for id in &orphaned {
            let _ = self.delete(id).await;
        }
        orphaned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_related_filters_by_type_and_active() {
        let manager = RelationshipManager::new();
        manager
            .create("t", "a", "b", RelationshipType::References, 0.5)
            .await
            .unwrap();
        let rel = manager
            .create("t", "a", "c", RelationshipType::Supports, 0.5)
            .await
            .unwrap();
        manager.delete(&rel.id).await.unwrap();

        let related = manager
            .find_related("a", &[RelationshipType::References], "t")
            .await;
        assert_eq!(related, HashSet::from(["b".to_string()]));
    }

    #[tokio::test]
    async fn build_graph_bfs_respects_max_depth() {
        let manager = RelationshipManager::new();
        manager
            .create("t", "a", "b", RelationshipType::References, 1.0)
            .await
            .unwrap();
        manager
            .create("t", "b", "c", RelationshipType::References, 1.0)
            .await
            .unwrap();

        let graph = manager.build_graph("a", 1, &[], false, "t").await;
        assert_eq!(graph.nodes, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(graph.stats.total_edges, 1);

        let graph = manager.build_graph("a", 2, &[], false, "t").await;
        assert_eq!(graph.stats.total_nodes, 3);
        assert_eq!(graph.stats.total_edges, 2);
    }

    #[tokio::test]
    async fn parent_child_creates_symmetric_typed_pair() {
        let manager = RelationshipManager::new();
        let (parent_to_child, child_to_parent) =
            manager.link_parent_child("t", "p", "c", 1.0).await.unwrap();
        assert_eq!(parent_to_child.relationship_type, RelationshipType::Parent);
        assert_eq!(child_to_parent.relationship_type, RelationshipType::Child);
    }

    #[tokio::test]
    async fn cleanup_orphaned_counts_each_relationship_once() {
        let manager = RelationshipManager::new();
        manager
            .create("t", "a", "missing", RelationshipType::References, 0.5)
            .await
            .unwrap();
        manager
            .create("t", "a", "b", RelationshipType::References, 0.5)
            .await
            .unwrap();

        let valid = HashSet::from(["a".to_string(), "b".to_string()]);
        let removed = manager.cleanup_orphaned(&valid, "t").await;
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn find_conflicts_returns_only_active_conflicts_edges() {
        let manager = RelationshipManager::new();
        manager.create("t", "a", "b", RelationshipType::Conflicts, 0.5).await.unwrap();
        manager.create("t", "a", "c", RelationshipType::References, 0.5).await.unwrap();

        let conflicts = manager.find_conflicts("a", "t").await;
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].target_memory_id, "b");
    }

    #[tokio::test]
    async fn suggest_skips_already_related_and_below_threshold_candidates() {
        let manager = RelationshipManager::new();
        manager.create("t", "a", "b", RelationshipType::References, 0.5).await.unwrap();

        let candidates = vec![
            ("b".to_string(), 0.9),
            ("c".to_string(), 0.95),
            ("d".to_string(), 0.2),
        ];
        let suggestions = manager.suggest("a", &candidates, 0.5, "t").await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].target_memory_id, "c");
    }

    #[tokio::test]
    async fn hierarchy_walks_parent_edges_into_a_tree() {
        let manager = RelationshipManager::new();
        manager.link_parent_child("t", "root", "child-1", 1.0).await.unwrap();
        manager.link_parent_child("t", "root", "child-2", 1.0).await.unwrap();
        manager.link_parent_child("t", "child-1", "grandchild", 1.0).await.unwrap();

        let tree = manager.hierarchy("root", "t").await;
        assert_eq!(tree.memory_id, "root");
        assert_eq!(tree.children.len(), 2);
        let child_1 = tree.children.iter().find(|c| c.memory_id == "child-1").unwrap();
        assert_eq!(child_1.children.len(), 1);
        assert_eq!(child_1.children[0].memory_id, "grandchild");
    }
}
