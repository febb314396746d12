//! Resilience configuration with builder pattern
//!
//! Provides a unified configuration for retry policies, request timeouts
//! and download concurrency with sane defaults.

use super::retry::RetryConfig;
use std::time::Duration;

/// Global resilience configuration for remote calls
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub timeouts: TimeoutConfig,
    pub concurrency: ConcurrencyConfig,
}

/// Per-call timeouts
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Upper bound for one attempt of the source query
    pub query: Duration,
    /// Upper bound for one asset download
    pub asset: Duration,
}

/// Concurrency limiting configuration
#[derive(Debug, Clone)]
pub struct ConcurrencyConfig {
    /// Maximum asset downloads in flight at once
    pub max_concurrent_downloads: usize,
    /// Whether concurrency limiting is enabled
    pub enabled: bool,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            concurrency: ConcurrencyConfig::default(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            query: Duration::from_secs(30),
            asset: Duration::from_secs(60),
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 8,
            enabled: true,
        }
    }
}

impl ResilienceConfig {
    /// Look up a named profile ("default", "conservative", "development", "disabled")
    pub fn profile(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "conservative" => Some(Self::conservative()),
            "development" => Some(Self::development()),
            "disabled" => Some(Self::disabled()),
            _ => None,
        }
    }

    /// Conservative config for hosted endpoints
    pub fn conservative() -> Self {
        Self {
            retry: RetryConfig::conservative(),
            timeouts: TimeoutConfig {
                query: Duration::from_secs(15),
                asset: Duration::from_secs(30),
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_downloads: 4,
                enabled: true,
            },
        }
    }

    /// Aggressive config for a local development API
    pub fn development() -> Self {
        Self {
            retry: RetryConfig::aggressive(),
            timeouts: TimeoutConfig {
                query: Duration::from_secs(120),
                asset: Duration::from_secs(120),
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_downloads: 32,
                enabled: false, // Often disabled in dev
            },
        }
    }

    /// Disable retries and limits (for testing)
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig {
                max_attempts: 1, // No retries
                base_delay: Duration::from_millis(0),
                max_delay: Duration::from_millis(0),
                backoff_multiplier: 1.0,
                jitter: false,
            },
            timeouts: TimeoutConfig::default(),
            concurrency: ConcurrencyConfig {
                max_concurrent_downloads: usize::MAX,
                enabled: false,
            },
        }
    }
}

/// Builder for ResilienceConfig
#[derive(Debug)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    /// Start from an existing configuration
    pub fn from_config(config: ResilienceConfig) -> Self {
        Self { config }
    }

    /// Set max retry attempts
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    /// Set the timeout for one query attempt
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts.query = timeout;
        self
    }

    /// Set the timeout for one asset download
    pub fn asset_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts.asset = timeout;
        self
    }

    /// Set max concurrent downloads
    pub fn max_concurrent_downloads(mut self, max: usize) -> Self {
        self.config.concurrency.max_concurrent_downloads = max;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}
