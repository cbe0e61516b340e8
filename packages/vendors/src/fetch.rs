//! Shared rate-limited page fetcher.
//!
//! Every vendor funnels its outbound HTTP through a [`Fetcher`], which
//! enforces the vendor's admission rules:
//!
//! 1. acquire one permit from the vendor semaphore (capacity
//!    `max_concurrency`);
//! 2. canonicalize the URL onto the vendor's `www.` host;
//! 3. GET with up to `max_retry` attempts, sleeping `i * retry_interval`
//!    before attempt `i + 1`;
//! 4. sleep `fetch_interval` before the permit is returned, so the next
//!    acquirer waits out the inter-request spacing.

use std::sync::Arc;

use regex::Regex;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::VendorError;
use crate::types::config::VendorConfig;
use crate::types::website::Website;

pub struct Fetcher {
    client: reqwest::Client,
    host: &'static str,
    lock: Arc<Semaphore>,
    cfg: VendorConfig,
    host_rewrite: Regex,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, host: &'static str, cfg: &VendorConfig) -> Self {
        let host_rewrite = Regex::new(&format!("^(http.*?)://.*?{}(.*)$", regex::escape(host)))
            .expect("host pattern is built from a literal domain");

        Self {
            client,
            host,
            lock: Arc::new(Semaphore::new(cfg.max_concurrency.max(1))),
            cfg: cfg.clone(),
            host_rewrite,
        }
    }

    /// Rewrite the scheme-host-path to the vendor's canonical `www.` host.
    pub fn canonical_url(&self, url: &str) -> String {
        self.host_rewrite
            .replace(url, format!("${{1}}://www.{}${{2}}", self.host))
            .into_owned()
    }

    /// Fetch the website's page body under the vendor's admission rules.
    pub async fn fetch(&self, web: &Website) -> Result<String, VendorError> {
        let permit = self.lock.acquire().await.ok();

        let url = self.canonical_url(&web.url);
        debug!(url = %url, vendor = self.host, "fetching website");
        let result = self.fetch_with_retry(&url).await;

        // Spacing is enforced before the permit goes back, so the next
        // acquirer cannot start until `fetch_interval` has elapsed.
        tokio::time::sleep(self.cfg.fetch_interval()).await;
        drop(permit);

        result
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String, VendorError> {
        let mut attempt: usize = 0;
        loop {
            attempt += 1;

            let outcome = match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if (200..300).contains(&status) {
                        return Ok(resp.text().await?);
                    }
                    Err(VendorError::InvalidStatusCode { status })
                }
                Err(err) => Err(VendorError::Http(err)),
            };

            if attempt >= self.cfg.max_retry.max(1) {
                return outcome;
            }

            tokio::time::sleep(self.cfg.retry_interval() * attempt as u32).await;
        }
    }
}
