//! Per-vendor and global website configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Rate-limit and retry settings for one vendor, immutable after load.
///
/// Loaded as a JSON map `host -> VendorConfig`, durations in seconds:
///
/// ```json
/// { "manhuagui.com": { "max_concurrency": 2, "fetch_interval_seconds": 5,
///                      "max_retry": 3, "retry_interval_seconds": 2 } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    /// Upper bound on in-flight HTTP requests to this vendor.
    pub max_concurrency: usize,
    /// Minimum spacing enforced after a fetch, before the permit is released.
    pub fetch_interval_seconds: u64,
    /// Attempts per fetch.
    pub max_retry: usize,
    /// Base for linear backoff between retries.
    pub retry_interval_seconds: u64,
}

impl VendorConfig {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_seconds)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }
}

/// Parse the vendor configuration map from its JSON serialization.
pub fn parse_vendor_configs(data: &str) -> Result<HashMap<String, VendorConfig>, serde_json::Error> {
    serde_json::from_str(data)
}

/// Globally shared website parsing configuration.
#[derive(Debug, Clone)]
pub struct WebsiteConfig {
    /// Joins extracted content fragments into `Website::raw_content`.
    pub separator: String,
    /// Bound used by some extractors when slicing parsed content.
    pub max_date_length: usize,
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
            max_date_length: 2,
        }
    }
}
