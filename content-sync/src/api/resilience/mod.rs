//! Resilience features for remote calls
//!
//! Provides retry policies, timeouts and concurrency limiting for the
//! source query and asset downloads.

pub mod concurrency;
pub mod config;
pub mod retry;

pub use concurrency::ConcurrencyLimiter;
pub use config::{ConcurrencyConfig, ResilienceConfig, ResilienceConfigBuilder, TimeoutConfig};
pub use retry::{RetryConfig, RetryPolicy, RetryableError};
