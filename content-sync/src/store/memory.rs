//! In-process node registry

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{NodeRegistry, RegisterOutcome};
use crate::nodes::{GraphNode, NodeId};

/// Node registry held in memory, used for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryNodeStore {
    nodes: RwLock<BTreeMap<NodeId, GraphNode>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every node, ordered by id
    pub async fn all(&self) -> Vec<GraphNode> {
        self.nodes.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl NodeRegistry for MemoryNodeStore {
    async fn register(&self, node: GraphNode) -> Result<RegisterOutcome> {
        let mut nodes = self.nodes.write().await;
        let outcome = RegisterOutcome::classify(nodes.get(&node.id), &node);
        if outcome != RegisterOutcome::Unchanged {
            nodes.insert(node.id, node);
        }
        Ok(outcome)
    }

    async fn get(&self, id: &NodeId) -> Result<Option<GraphNode>> {
        Ok(self.nodes.read().await.get(id).cloned())
    }

    async fn nodes_by_type(&self, type_name: &str) -> Result<Vec<GraphNode>> {
        Ok(self
            .nodes
            .read()
            .await
            .values()
            .filter(|n| n.type_name() == type_name)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.nodes.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::EntityType;
    use crate::services::sync::Synchronizer;
    use serde_json::json;

    fn author(id: i64, name: &str) -> GraphNode {
        Synchronizer::new("test")
            .synchronize_record(EntityType::Author, 0, &json!({ "id": id, "name": name }))
            .unwrap()
            .into_node()
    }

    #[tokio::test]
    async fn test_register_classifies_changes() {
        let store = MemoryNodeStore::new();

        assert_eq!(store.register(author(1, "Jay")).await.unwrap(), RegisterOutcome::Created);
        assert_eq!(store.register(author(1, "Jay")).await.unwrap(), RegisterOutcome::Unchanged);
        assert_eq!(store.register(author(1, "Kay")).await.unwrap(), RegisterOutcome::Updated);
        assert_eq!(store.count().await.unwrap(), 1);

        let stored = store.get(&author(1, "x").id).await.unwrap().unwrap();
        assert_eq!(stored.str_field("name"), Some("Kay"));
    }

    #[tokio::test]
    async fn test_nodes_by_type() {
        let store = MemoryNodeStore::new();
        store.register(author(1, "Jay")).await.unwrap();
        store.register(author(2, "Kay")).await.unwrap();

        assert_eq!(store.nodes_by_type("Author").await.unwrap().len(), 2);
        assert!(store.nodes_by_type("Post").await.unwrap().is_empty());
    }
}
