//! The source query and GraphQL wire types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::QueryError;

/// Fetches every post and author in one round trip
pub const SOURCE_QUERY: &str = r#"query {
  posts {
    id
    description
    slug
    imgUrl
    imgAlt
    author {
      id
      name
    }
  }
  authors {
    id
    name
  }
}"#;

/// Body of a GraphQL POST request
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

impl<'a> GraphqlRequest<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            variables: None,
        }
    }
}

/// One entry of the `errors` array
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlErrorMessage {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<Value>>,
}

impl GraphqlErrorMessage {
    fn describe(&self) -> String {
        match &self.path {
            Some(path) if !path.is_empty() => {
                let path: Vec<String> = path
                    .iter()
                    .map(|p| match p {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                format!("{} (at {})", self.message, path.join("."))
            }
            _ => self.message.clone(),
        }
    }
}

/// A GraphQL response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    /// Some servers send `"errors": null` on success
    #[serde(default)]
    pub errors: Option<Vec<GraphqlErrorMessage>>,
}

impl GraphqlResponse {
    /// Extract `data`, failing if the server reported any errors
    ///
    /// Partial data alongside errors is rejected so a failed fetch never
    /// registers a half-updated node set.
    pub fn into_data(self) -> Result<Map<String, Value>, QueryError> {
        let errors = self.errors.unwrap_or_default();
        if !errors.is_empty() {
            return Err(QueryError::Graphql(
                errors.iter().map(GraphqlErrorMessage::describe).collect(),
            ));
        }
        self.data.ok_or(QueryError::MissingData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_requests_both_collections() {
        assert!(SOURCE_QUERY.contains("posts {"));
        assert!(SOURCE_QUERY.contains("authors {"));
        assert!(SOURCE_QUERY.contains("imgUrl"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GraphqlRequest::new("query { a }")).unwrap();
        assert_eq!(body, json!({ "query": "query { a }" }));
    }

    #[test]
    fn test_into_data_success() {
        let response: GraphqlResponse =
            serde_json::from_value(json!({ "data": { "posts": [], "authors": [] } })).unwrap();

        let data = response.into_data().unwrap();
        assert!(data.contains_key("posts"));
    }

    #[test]
    fn test_into_data_with_errors() {
        let response: GraphqlResponse = serde_json::from_value(json!({
            "data": { "posts": [] },
            "errors": [{ "message": "boom", "path": ["authors", 0] }]
        }))
        .unwrap();

        let err = response.into_data().unwrap_err();
        assert!(matches!(&err, QueryError::Graphql(msgs) if msgs == &vec!["boom (at authors.0)".to_string()]));
    }

    #[test]
    fn test_into_data_null_or_empty_errors() {
        for errors in [json!(null), json!([])] {
            let response: GraphqlResponse = serde_json::from_value(json!({
                "data": { "posts": [], "authors": [] },
                "errors": errors
            }))
            .unwrap();

            assert!(response.into_data().unwrap().contains_key("authors"));
        }
    }

    #[test]
    fn test_into_data_missing() {
        let response: GraphqlResponse = serde_json::from_value(json!({ "data": null })).unwrap();
        assert!(matches!(response.into_data(), Err(QueryError::MissingData)));
    }
}
