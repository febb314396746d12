//! Error types for content-sync
//!
//! Record-level errors are collected per pass and never abort it. Query errors
//! abort the pass before anything is registered.

use crate::records::EntityType;

/// Failure of the top-level GraphQL query
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("Endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL errors: {}", .0.join("; "))]
    Graphql(Vec<String>),

    #[error("Failed to decode query response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Query response has no data")]
    MissingData,

    #[error("Query response is missing the '{0}' collection")]
    MissingCollection(String),
}

/// Failure to turn one raw record into a node creation request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("{entity_type} record #{index} has no usable id")]
    Identity { entity_type: EntityType, index: usize },

    #[error("{entity_type} record #{index} cannot be serialized: {message}")]
    Serialization {
        entity_type: EntityType,
        index: usize,
        message: String,
    },
}

impl RecordError {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Identity { entity_type, .. } => *entity_type,
            Self::Serialization { entity_type, .. } => *entity_type,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Identity { index, .. } => *index,
            Self::Serialization { index, .. } => *index,
        }
    }
}

/// Failure to fetch or cache a remote asset
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Fetching {url} timed out")]
    Timeout { url: String },

    #[error("Asset cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Asset cache metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Failure of a whole synchronization pass
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Remote query failed: {0}")]
    Query(#[from] QueryError),

    #[error("Node registration failed: {0}")]
    Store(#[source] anyhow::Error),
}
