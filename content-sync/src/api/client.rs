//! GraphQL HTTP client

use log::{debug, info};
use reqwest::Url;
use serde_json::{Map, Value};
use std::time::Instant;

use super::query::{GraphqlRequest, GraphqlResponse};
use super::resilience::{ResilienceConfig, RetryPolicy, RetryableError};
use crate::error::QueryError;

/// Longest response body kept in a [`QueryError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Client for one GraphQL endpoint
///
/// Constructed once per process and shared by reference.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: Url,
    retry: RetryPolicy,
}

impl GraphqlClient {
    pub fn new(endpoint: Url, resilience: &ResilienceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(resilience.timeouts.query)
            .user_agent(concat!("content-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            retry: RetryPolicy::new(resilience.retry.clone()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Run a query and return its `data` object, retrying transient failures
    pub async fn query(&self, query: &str) -> Result<Map<String, Value>, QueryError> {
        let start = Instant::now();
        let data = self
            .retry
            .execute("GraphQL query", || self.query_once(query))
            .await?;

        info!(
            "Query against {} completed in {:.2}ms",
            self.endpoint,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(data)
    }

    async fn query_once(&self, query: &str) -> Result<Map<String, Value>, QueryError> {
        debug!("POST {}", self.endpoint);

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&GraphqlRequest::new(query))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        let parsed: GraphqlResponse = serde_json::from_slice(&bytes)?;
        parsed.into_data()
    }

    fn transport_error(&self, source: reqwest::Error) -> QueryError {
        if source.is_timeout() {
            QueryError::Timeout {
                endpoint: self.endpoint.to_string(),
            }
        } else {
            QueryError::Transport {
                endpoint: self.endpoint.to_string(),
                source,
            }
        }
    }
}

impl RetryableError for QueryError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Graphql(_) | Self::Decode(_) | Self::MissingData | Self::MissingCollection(_) => {
                false
            }
        }
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(QueryError::Timeout { endpoint: "x".into() }.is_retryable());
        assert!(QueryError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(QueryError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!QueryError::Status { status: 400, body: String::new() }.is_retryable());
        assert!(!QueryError::Graphql(vec!["bad".into()]).is_retryable());
        assert!(!QueryError::MissingData.is_retryable());
    }

    #[test]
    fn test_floor_char_boundary() {
        assert_eq!(floor_char_boundary("abc", 10), 3);
        assert_eq!(floor_char_boundary("abcdef", 4), 4);
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(floor_char_boundary("aéb", 2), 1);
    }

    #[test]
    fn test_client_keeps_endpoint() {
        let endpoint = Url::parse("http://localhost:4000").unwrap();
        let client = GraphqlClient::new(endpoint.clone(), &ResilienceConfig::disabled()).unwrap();
        assert_eq!(client.endpoint(), &endpoint);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let endpoint = Url::parse("http://127.0.0.1:9/").unwrap();
        let client = GraphqlClient::new(endpoint, &ResilienceConfig::disabled()).unwrap();

        let err = client.query("query { posts { id } }").await.unwrap_err();
        assert!(matches!(err, QueryError::Transport { .. } | QueryError::Timeout { .. }));
    }
}
