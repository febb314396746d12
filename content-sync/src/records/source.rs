//! Typed views of the records returned by the content API
//!
//! Raw JSON records are decoded here, at the boundary, to check their shape
//! and read the remote id. Node fields and digests are built from the raw
//! object itself, so explicit nulls and unknown fields are kept as sent.

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::entity::{EntityType, RemoteId};

/// Author as embedded inside a post
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorRef {
    #[serde(default)]
    pub id: Option<RemoteId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A blog post
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub id: Option<RemoteId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub img_alt: Option<String>,
    #[serde(default)]
    pub author: Option<AuthorRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A post author
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorRecord {
    #[serde(default)]
    pub id: Option<RemoteId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoded record, tagged by entity type
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRecord {
    Post(PostRecord),
    Author(AuthorRecord),
}

impl SourceRecord {
    /// Decode a raw JSON record of the given entity type
    pub fn decode(entity_type: EntityType, raw: &Value) -> serde_json::Result<Self> {
        if !raw.is_object() {
            return Err(serde_json::Error::custom(format!(
                "expected an object, found {}",
                json_kind(raw)
            )));
        }

        match entity_type {
            EntityType::Post => PostRecord::deserialize(raw).map(Self::Post),
            EntityType::Author => AuthorRecord::deserialize(raw).map(Self::Author),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Post(_) => EntityType::Post,
            Self::Author(_) => EntityType::Author,
        }
    }

    /// Remote id, if present and non-empty
    pub fn remote_id(&self) -> Option<&RemoteId> {
        let id = match self {
            Self::Post(post) => post.id.as_ref(),
            Self::Author(author) => author.id.as_ref(),
        };
        id.filter(|id| !id.is_empty())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_post_with_author() {
        let raw = json!({
            "id": "p1",
            "description": "My first post!",
            "slug": "first-post",
            "imgUrl": "https://example.com/a.jpg",
            "imgAlt": "A picture",
            "author": { "id": "a1", "name": "Jay" }
        });

        let record = SourceRecord::decode(EntityType::Post, &raw).unwrap();
        let SourceRecord::Post(post) = &record else {
            panic!("expected a post");
        };

        assert_eq!(post.img_url.as_deref(), Some("https://example.com/a.jpg"));
        assert_eq!(post.author.as_ref().unwrap().name.as_deref(), Some("Jay"));
        assert_eq!(record.remote_id(), Some(&RemoteId::from("p1")));
    }

    #[test]
    fn test_decode_keeps_unknown_fields() {
        let raw = json!({ "id": 7, "name": "Jay", "twitter": "@jay" });

        let record = SourceRecord::decode(EntityType::Author, &raw).unwrap();
        let SourceRecord::Author(author) = &record else {
            panic!("expected an author");
        };

        assert_eq!(author.extra.get("twitter"), Some(&json!("@jay")));
        assert_eq!(record.remote_id(), Some(&RemoteId::Int(7)));
    }

    #[test]
    fn test_decode_reads_camel_case() {
        let raw = json!({ "id": 1, "imgUrl": "u", "imgAlt": "alt", "img_url": "other" });
        let SourceRecord::Post(post) = SourceRecord::decode(EntityType::Post, &raw).unwrap() else {
            panic!("expected a post");
        };

        assert_eq!(post.img_url.as_deref(), Some("u"));
        assert_eq!(post.img_alt.as_deref(), Some("alt"));
        assert_eq!(post.extra.get("img_url"), Some(&json!("other")));
    }

    #[test]
    fn test_decode_accepts_null_fields() {
        let raw = json!({ "id": 1, "imgUrl": null, "author": null });
        let SourceRecord::Post(post) = SourceRecord::decode(EntityType::Post, &raw).unwrap() else {
            panic!("expected a post");
        };

        assert!(post.img_url.is_none());
        assert!(post.author.is_none());
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = SourceRecord::decode(EntityType::Post, &json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_decode_rejects_wrong_field_type() {
        let raw = json!({ "id": 1, "description": 42 });
        assert!(SourceRecord::decode(EntityType::Post, &raw).is_err());
    }

    #[test]
    fn test_missing_or_empty_id() {
        let missing = SourceRecord::decode(EntityType::Author, &json!({ "name": "x" })).unwrap();
        let null = SourceRecord::decode(EntityType::Author, &json!({ "id": null })).unwrap();
        let blank = SourceRecord::decode(EntityType::Author, &json!({ "id": " " })).unwrap();

        assert!(missing.remote_id().is_none());
        assert!(null.remote_id().is_none());
        assert!(blank.remote_id().is_none());
    }
}
