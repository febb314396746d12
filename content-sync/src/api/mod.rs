//! Content API access
//!
//! GraphQL client, the fixed source query, and the resilience features
//! (retry, timeouts, download concurrency) used for every remote call.

pub mod client;
pub mod query;
pub mod resilience;
pub mod source;

pub use client::GraphqlClient;
pub use query::{GraphqlRequest, GraphqlResponse, SOURCE_QUERY};
pub use resilience::{
    ConcurrencyConfig, ConcurrencyLimiter, ResilienceConfig, RetryConfig, RetryPolicy,
    RetryableError, TimeoutConfig,
};
pub use source::{ContentSource, GraphqlSource, OfflineSource};
