//! Configuration for the acquisition pipeline.

use std::time::Duration;

use catalog::search::{DEFAULT_MAX_ITEMS, DEFAULT_PAGE_SIZE};
use catalog::{CatalogEndpoints, RetryPolicy};

/// Configuration for the acquisition pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// Items opened and read concurrently.
    pub max_concurrent_items: usize,

    /// Cap on catalog search results per query.
    pub max_items: usize,

    /// STAC page size.
    pub page_size: usize,

    /// Timeout of a single catalog request.
    pub request_timeout: Duration,

    /// Backoff applied to each catalog page request.
    pub retry: RetryPolicy,

    /// Search endpoints per provider.
    pub endpoints: CatalogEndpoints,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_items: 8,
            max_items: DEFAULT_MAX_ITEMS,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            endpoints: CatalogEndpoints::default(),
        }
    }
}

impl AcquisitionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SAT_MAX_CONCURRENT") {
            if let Ok(n) = val.parse() {
                config.max_concurrent_items = n;
            }
        }

        if let Ok(val) = std::env::var("SAT_MAX_ITEMS") {
            if let Ok(n) = val.parse() {
                config.max_items = n;
            }
        }

        if let Ok(val) = std::env::var("SAT_PAGE_SIZE") {
            if let Ok(n) = val.parse() {
                config.page_size = n;
            }
        }

        if let Ok(val) = std::env::var("SAT_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("SAT_RETRY_MAX_ATTEMPTS") {
            if let Ok(n) = val.parse() {
                config.retry.max_attempts = n;
            }
        }

        if let Ok(val) = std::env::var("SAT_RETRY_INITIAL_DELAY_MS") {
            if let Ok(ms) = val.parse() {
                config.retry.initial_delay = Duration::from_millis(ms);
            }
        }

        if let Ok(val) = std::env::var("SAT_MPC_ENDPOINT") {
            config.endpoints.planetary_computer = val;
        }

        if let Ok(val) = std::env::var("SAT_EARTH_SEARCH_ENDPOINT") {
            config.endpoints.earth_search = val;
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_items == 0 {
            return Err("max_concurrent_items must be > 0".to_string());
        }

        if self.max_items == 0 {
            return Err("max_items must be > 0".to_string());
        }

        if self.page_size == 0 {
            return Err("page_size must be > 0".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("request_timeout must be > 0".to_string());
        }

        if self.retry.max_attempts == 0 {
            return Err("retry max_attempts must be >= 1".to_string());
        }

        if self.retry.initial_delay > self.retry.max_delay {
            return Err("retry initial_delay must not exceed max_delay".to_string());
        }

        for url in [&self.endpoints.planetary_computer, &self.endpoints.earth_search] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("catalog endpoint '{}' is not an http(s) URL", url));
            }
        }

        Ok(())
    }
}
