//! content-sync
//!
//! Fetches posts and authors from a GraphQL content API and registers them as
//! typed nodes in a content graph, with deterministic node ids, content
//! digests, and optional remote image materialization.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod nodes;
pub mod plugin;
pub mod records;
pub mod schema;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AssetError, QueryError, RecordError, SyncError};
pub use nodes::{ContentDigest, GraphNode, NodeCreationRequest, NodeId};
pub use plugin::SourcePlugin;
pub use records::{EntityType, SourceBatch};
pub use schema::SchemaDefinition;
pub use services::sync::{PassReport, SyncOutcome, Synchronizer};
pub use store::{MemoryNodeStore, NodeRegistry, RegisterOutcome, SqliteNodeStore};
