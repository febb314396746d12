//! Deterministic node identity
//!
//! Ids are UUIDv5, nested through a source namespace and then the node type
//! name, so an id is a pure function of (namespace, type, key).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Root namespace for every content-sync node id
const ROOT_NAMESPACE: Uuid = Uuid::from_bytes([
    0x3c, 0x0f, 0x5e, 0x1a, 0x8b, 0x41, 0x4f, 0x2d, 0x9a, 0x77, 0x12, 0xd4, 0x6e, 0x0b, 0x95, 0xc1,
]);

/// Identity of a node in the content graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Derives node ids within one source namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIdFactory {
    namespace: Uuid,
}

impl NodeIdFactory {
    /// Create a factory for the given source namespace (usually the plugin name)
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: Uuid::new_v5(&ROOT_NAMESPACE, namespace.as_bytes()),
        }
    }

    /// Id of the node of `type_name` keyed by `key`
    pub fn node_id(&self, type_name: &str, key: &str) -> NodeId {
        let type_namespace = Uuid::new_v5(&self.namespace, type_name.as_bytes());
        NodeId(Uuid::new_v5(&type_namespace, key.as_bytes()))
    }
}
