//! Node registry
//!
//! Where sync passes put their nodes. Registration is keyed by node id and
//! reports whether the node was new, changed (different content digest), or
//! already present as-is.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

use crate::nodes::{GraphNode, NodeId};

pub use memory::MemoryNodeStore;
pub use sqlite::SqliteNodeStore;

/// Effect of registering one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterOutcome {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for RegisterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

impl RegisterOutcome {
    /// Compare a stored node (if any) against an incoming one
    pub fn classify(existing: Option<&GraphNode>, incoming: &GraphNode) -> Self {
        match existing {
            None => Self::Created,
            Some(node)
                if node.digest() == incoming.digest()
                    && node.links == incoming.links
                    && node.children == incoming.children
                    && node.parent == incoming.parent =>
            {
                Self::Unchanged
            }
            Some(_) => Self::Updated,
        }
    }
}

/// Accepts nodes and answers lookups
#[async_trait]
pub trait NodeRegistry: Send + Sync {
    /// Insert or replace a node
    async fn register(&self, node: GraphNode) -> Result<RegisterOutcome>;

    async fn get(&self, id: &NodeId) -> Result<Option<GraphNode>>;

    /// All nodes of a type, ordered by id
    async fn nodes_by_type(&self, type_name: &str) -> Result<Vec<GraphNode>>;

    async fn count(&self) -> Result<usize>;
}
