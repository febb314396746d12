//! Entity types and remote identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity types served by the content API
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Post,
    Author,
}

impl EntityType {
    /// All entity types, in the order a pass processes them
    pub const ALL: [EntityType; 2] = [EntityType::Post, EntityType::Author];

    /// Node type name used in the content graph (e.g., "Post")
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Post => "Post",
            Self::Author => "Author",
        }
    }

    /// Collection name in the GraphQL response (e.g., "posts")
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Author => "authors",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Identifier assigned by the remote source, unique only within one entity type
///
/// The API may return ids as strings or integers; both spell the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Int(i64),
    Text(String),
}

impl RemoteId {
    /// The id as used for identity derivation
    pub fn key(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Absent for identity purposes: blank or whitespace-only text
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Int(_) => false,
            Self::Text(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<i64> for RemoteId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_names() {
        assert_eq!(EntityType::Post.type_name(), "Post");
        assert_eq!(EntityType::Author.collection(), "authors");
        assert_eq!(EntityType::Author.to_string(), "Author");
        assert_eq!(EntityType::ALL[0], EntityType::Post);
    }

    #[test]
    fn test_remote_id_int_and_text_share_key() {
        let int: RemoteId = serde_json::from_str("1").unwrap();
        let text: RemoteId = serde_json::from_str("\"1\"").unwrap();

        assert_eq!(int, RemoteId::Int(1));
        assert_eq!(text, RemoteId::Text("1".to_string()));
        assert_eq!(int.key(), text.key());
    }

    #[test]
    fn test_remote_id_key_keeps_whitespace() {
        assert_eq!(RemoteId::from(" 1").key(), " 1");
        assert_ne!(RemoteId::from(" 1").key(), RemoteId::from("1").key());
    }

    #[test]
    fn test_remote_id_empty() {
        assert!(RemoteId::from("   ").is_empty());
        assert!(RemoteId::from("").is_empty());
        assert!(!RemoteId::from(0).is_empty());
        assert!(!RemoteId::from("abc").is_empty());
    }
}
