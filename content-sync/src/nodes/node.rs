//! Graph node types handed to the node registry

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::digest::ContentDigest;
use super::identity::NodeId;
use crate::records::{EntityType, RemoteId};

/// Bookkeeping attached to every node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInternal {
    /// Node type name (e.g., "Post", "File")
    #[serde(rename = "type")]
    pub type_name: String,
    /// Canonical serialization of the source content
    pub content: String,
    pub content_digest: ContentDigest,
    /// Name of the source that owns the node
    pub owner: String,
}

/// A unit of content in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// All fields of the source record
    pub fields: Map<String, Value>,
    /// Named edges to other nodes (e.g., "author", "remoteImage")
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, NodeId>,
    pub internal: NodeInternal,
}

impl GraphNode {
    pub fn type_name(&self) -> &str {
        &self.internal.type_name
    }

    pub fn digest(&self) -> &ContentDigest {
        &self.internal.content_digest
    }

    /// String value of a top-level field, if present and non-empty
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Value at a dotted path into the fields (e.g., "author.name")
    pub fn field_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }
}

/// A node ready for registration, with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCreationRequest {
    pub node: GraphNode,
    pub entity_type: EntityType,
    pub remote_id: RemoteId,
    /// Position of the record within its collection
    pub index: usize,
}

impl NodeCreationRequest {
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Attach an edge before the node is registered
    pub fn link(&mut self, field: impl Into<String>, target: NodeId) {
        self.node.links.insert(field.into(), target);
    }

    pub fn into_node(self) -> GraphNode {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeIdFactory;
    use serde_json::json;

    fn sample_node() -> GraphNode {
        let Value::Object(fields) = json!({
            "id": 1,
            "slug": "  ",
            "description": "hello",
            "author": { "id": "a1", "name": "Jay" }
        }) else {
            unreachable!()
        };

        GraphNode {
            id: NodeIdFactory::new("test").node_id("Post", "1"),
            parent: None,
            children: Vec::new(),
            fields,
            links: BTreeMap::new(),
            internal: NodeInternal {
                type_name: "Post".to_string(),
                content: "{}".to_string(),
                content_digest: ContentDigest::of_bytes(b"{}"),
                owner: "test".to_string(),
            },
        }
    }

    #[test]
    fn test_str_field_skips_blank() {
        let node = sample_node();
        assert_eq!(node.str_field("description"), Some("hello"));
        assert_eq!(node.str_field("slug"), None);
        assert_eq!(node.str_field("missing"), None);
    }

    #[test]
    fn test_field_path() {
        let node = sample_node();
        assert_eq!(node.field_path("author.name"), Some(&json!("Jay")));
        assert_eq!(node.field_path("author.missing"), None);
        assert_eq!(node.field_path("description"), Some(&json!("hello")));
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(sample_node()).unwrap();

        assert_eq!(value["parent"], Value::Null);
        assert_eq!(value["children"], json!([]));
        assert_eq!(value["internal"]["type"], json!("Post"));
        assert!(value["internal"]["contentDigest"].is_string());
        assert!(value.get("links").is_none());
    }
}
