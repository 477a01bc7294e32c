//! Ledger configuration
//!
//! Controls conflict handling in the transfer engine and the page size cap
//! applied by every listing.

use crate::types::DEFAULT_MAX_PAGE_SIZE;
use std::time::Duration;
use tracing::warn;

/// Tunables for the ledger core
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Attempts a transfer gets before a conflict is reported to the caller
    pub max_attempts: u32,
    /// How long to wait for an account row lock before declaring a conflict
    pub lock_timeout: Duration,
    /// Pause between conflicting attempts
    pub retry_backoff: Duration,
    /// Largest accepted `page_size`
    pub max_page_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lock_timeout: Duration::from_millis(250),
            retry_backoff: Duration::from_millis(5),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl LedgerConfig {
    /// Create a new LedgerConfig with custom retry values
    ///
    /// Zero values fall back to the defaults.
    pub fn new(max_attempts: u32, lock_timeout: Duration) -> Self {
        let default = Self::default();

        let max_attempts = if max_attempts == 0 {
            warn!(
                max_attempts,
                fallback = default.max_attempts,
                "Invalid max_attempts, using default"
            );
            default.max_attempts
        } else {
            max_attempts
        };

        let lock_timeout = if lock_timeout.is_zero() {
            warn!(
                fallback_ms = default.lock_timeout.as_millis() as u64,
                "Invalid lock_timeout, using default"
            );
            default.lock_timeout
        } else {
            lock_timeout
        };

        Self {
            max_attempts,
            lock_timeout,
            ..default
        }
    }

    /// Override the retry backoff
    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    /// Override the page size cap; zero keeps the current value
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        if max_page_size > 0 {
            self.max_page_size = max_page_size;
        }
        self
    }
}
