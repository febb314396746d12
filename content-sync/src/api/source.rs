//! Content sources: where a pass gets its records from

use async_trait::async_trait;
use log::info;

use super::client::GraphqlClient;
use super::query::SOURCE_QUERY;
use crate::error::QueryError;
use crate::records::SourceBatch;

/// Fetches one batch of raw records
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Human-readable description for logs
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<SourceBatch, QueryError>;
}

/// Runs the source query against a GraphQL endpoint
#[derive(Debug, Clone)]
pub struct GraphqlSource {
    client: GraphqlClient,
}

impl GraphqlSource {
    pub fn new(client: GraphqlClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContentSource for GraphqlSource {
    fn describe(&self) -> String {
        format!("GraphQL endpoint {}", self.client.endpoint())
    }

    async fn fetch(&self) -> Result<SourceBatch, QueryError> {
        let data = self.client.query(SOURCE_QUERY).await?;
        let batch = SourceBatch::from_query_data(data)?;
        info!("Fetched {} records from {}", batch.len(), self.client.endpoint());
        Ok(batch)
    }
}

/// Source that never contacts the network and yields nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

#[async_trait]
impl ContentSource for OfflineSource {
    fn describe(&self) -> String {
        "offline source".to_string()
    }

    async fn fetch(&self) -> Result<SourceBatch, QueryError> {
        info!("Offline mode: no records fetched");
        Ok(SourceBatch::new())
    }
}
