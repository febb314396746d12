//! Concurrency limiter implementation
//!
//! Provides a semaphore-based limiter for controlling how many asset
//! downloads are in flight at once.

use super::config::ConcurrencyConfig;
use log::debug;
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Used when limiting is disabled (Tokio Semaphore max is 2^61-1)
const UNLIMITED_PERMITS: usize = 1_000_000;

/// Semaphore-based concurrency limiter for controlling concurrent downloads
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    config: ConcurrencyConfig,
}

impl ConcurrencyLimiter {
    /// Create a new concurrency limiter with the given configuration
    pub fn new(config: ConcurrencyConfig) -> Self {
        let permits = if config.enabled {
            config.max_concurrent_downloads.clamp(1, UNLIMITED_PERMITS)
        } else {
            UNLIMITED_PERMITS
        };

        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
        }
    }

    /// Acquire a permit for a download. Waits if at capacity.
    /// Returns an owned permit that releases automatically when dropped.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        if self.config.enabled && self.semaphore.available_permits() == 0 {
            debug!(
                "Concurrency limiter: waiting for permit ({} in use)",
                self.config.max_concurrent_downloads
            );
        }

        let permit = self.semaphore.clone().acquire_owned().await?;

        if self.config.enabled {
            debug!(
                "Concurrency limiter: acquired permit ({} available)",
                self.semaphore.available_permits()
            );
        }

        Ok(permit)
    }
}
