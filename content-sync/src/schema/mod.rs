//! Schema declaration for sourced node types
//!
//! Declared once at startup. Describes the field shapes of `Post` and
//! `Author` and the two edges: `Post.remoteImage` to the materialized `File`
//! node, and `Post.author` to the `Author` whose `name` matches.

use log::debug;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::nodes::{GraphNode, NodeCreationRequest, NodeId};
use crate::services::assets::FILE_NODE_TYPE;

/// JSON shape of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    String,
    Object,
}

impl FieldKind {
    fn graphql_type(&self) -> &'static str {
        match self {
            Self::Id => "ID!",
            Self::String => "String",
            Self::Object => "JSON",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Id => value.is_string() || value.is_i64() || value.is_u64(),
            Self::String => value.is_string() || value.is_null(),
            Self::Object => value.is_object() || value.is_null(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    pub name: String,
    pub kind: FieldKind,
}

/// How a link field finds its target
#[derive(Debug, Clone, PartialEq)]
pub enum LinkKind {
    /// Target id is set directly (asset edges)
    ById,
    /// Target is the node whose `by` field equals the value at `from`
    ByField { from: String, by: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkShape {
    pub field: String,
    pub target: String,
    pub kind: LinkKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeShape {
    pub name: String,
    pub fields: Vec<FieldShape>,
    pub links: Vec<LinkShape>,
}

impl TypeShape {
    fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field that does not match the declared schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMismatch {
    Undeclared { field: String },
    WrongKind { field: String, expected: FieldKind },
}

impl std::fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undeclared { field } => write!(f, "undeclared field '{}'", field),
            Self::WrongKind { field, expected } => {
                write!(f, "field '{}' is not {}", field, expected.graphql_type())
            }
        }
    }
}

/// Declared node types and their edges
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDefinition {
    types: Vec<TypeShape>,
}

fn field(name: &str, kind: FieldKind) -> FieldShape {
    FieldShape {
        name: name.to_string(),
        kind,
    }
}

impl SchemaDefinition {
    /// Schema for posts and authors, with the asset edge named `image_link`
    pub fn source_schema(image_link: &str) -> Self {
        Self {
            types: vec![
                TypeShape {
                    name: "Post".to_string(),
                    fields: vec![
                        field("id", FieldKind::Id),
                        field("description", FieldKind::String),
                        field("slug", FieldKind::String),
                        field("imgUrl", FieldKind::String),
                        field("imgAlt", FieldKind::String),
                        field("author", FieldKind::Object),
                    ],
                    links: vec![
                        LinkShape {
                            field: "author".to_string(),
                            target: "Author".to_string(),
                            kind: LinkKind::ByField {
                                from: "author.name".to_string(),
                                by: "name".to_string(),
                            },
                        },
                        LinkShape {
                            field: image_link.to_string(),
                            target: FILE_NODE_TYPE.to_string(),
                            kind: LinkKind::ById,
                        },
                    ],
                },
                TypeShape {
                    name: "Author".to_string(),
                    fields: vec![field("id", FieldKind::Id), field("name", FieldKind::String)],
                    links: Vec::new(),
                },
            ],
        }
    }

    /// Schema without the asset edge
    pub fn without_assets() -> Self {
        let mut schema = Self::source_schema("");
        for shape in &mut schema.types {
            shape.links.retain(|l| l.kind != LinkKind::ById);
        }
        schema
    }

    pub fn types(&self) -> &[TypeShape] {
        &self.types
    }

    pub fn type_shape(&self, name: &str) -> Option<&TypeShape> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Types that field-match links point at
    pub fn field_link_targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self
            .types
            .iter()
            .flat_map(|t| t.links.iter())
            .filter(|l| matches!(l.kind, LinkKind::ByField { .. }))
            .map(|l| l.target.as_str())
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }

    /// Render the type definitions
    pub fn to_sdl(&self) -> String {
        let mut out = String::new();

        for (i, shape) in self.types.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "type {} implements Node {{", shape.name);

            for f in &shape.fields {
                // Fields replaced by a link are rendered with the link
                if shape.links.iter().any(|l| l.field == f.name) {
                    continue;
                }
                let _ = writeln!(out, "  {}: {}", f.name, f.kind.graphql_type());
            }

            for link in &shape.links {
                let directive = match &link.kind {
                    LinkKind::ById => "@link".to_string(),
                    LinkKind::ByField { from, by } => {
                        format!("@link(from: \"{}\", by: \"{}\")", from, by)
                    }
                };
                let _ = writeln!(out, "  {}: {} {}", link.field, link.target, directive);
            }

            out.push_str("}\n");
        }

        out
    }

    /// Compare emitted fields with the declared shape of `type_name`
    ///
    /// Undeclared types accept anything.
    pub fn check_fields(&self, type_name: &str, fields: &Map<String, Value>) -> Vec<FieldMismatch> {
        let Some(shape) = self.type_shape(type_name) else {
            return Vec::new();
        };

        let mut mismatches: Vec<FieldMismatch> = fields
            .iter()
            .filter_map(|(name, value)| match shape.field(name) {
                None => Some(FieldMismatch::Undeclared {
                    field: name.clone(),
                }),
                Some(declared) if !declared.kind.accepts(value) => Some(FieldMismatch::WrongKind {
                    field: name.clone(),
                    expected: declared.kind,
                }),
                Some(_) => None,
            })
            .collect();
        mismatches.sort_by(|a, b| format!("{:?}", a).cmp(&format!("{:?}", b)));
        mismatches
    }

    /// Fill field-match edges on `requests`
    ///
    /// Targets are looked up among `requests` themselves first, then among
    /// `existing` (nodes already in the store). Returns the number of edges set.
    pub fn resolve_links(&self, requests: &mut [NodeCreationRequest], existing: &[GraphNode]) -> usize {
        let mut resolved = 0;

        for shape in &self.types {
            for link in &shape.links {
                let LinkKind::ByField { from, by } = &link.kind else {
                    continue;
                };

                let index = build_index(&link.target, by, requests, existing);

                for request in requests.iter_mut().filter(|r| r.node.type_name() == shape.name) {
                    let Some(key) = request.node.field_path(from).and_then(value_key) else {
                        continue;
                    };
                    match index.get(&key) {
                        Some(target) => {
                            request.link(link.field.clone(), *target);
                            resolved += 1;
                        }
                        None => debug!(
                            "{} {}: no {} with {} = {}",
                            shape.name,
                            request.id(),
                            link.target,
                            by,
                            key
                        ),
                    }
                }
            }
        }

        resolved
    }
}

/// Map `by` field values to node ids for nodes of `target` type
///
/// Nodes from the current pass win over stored ones.
fn build_index(
    target: &str,
    by: &str,
    requests: &[NodeCreationRequest],
    existing: &[GraphNode],
) -> HashMap<String, NodeId> {
    let mut index = HashMap::new();

    let candidates = existing
        .iter()
        .chain(requests.iter().map(|r| &r.node))
        .filter(|n| n.type_name() == target);

    for node in candidates {
        if let Some(key) = node.fields.get(by).and_then(value_key) {
            index.insert(key, node.id);
        }
    }

    index
}

fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
