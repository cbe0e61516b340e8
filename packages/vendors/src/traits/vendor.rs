//! The vendor extractor contract.

use async_trait::async_trait;

use crate::error::VendorError;
use crate::types::website::Website;

/// One family of index pages the pipeline knows how to watch.
///
/// Implementations own their rate-limit semaphore and a handle on the
/// persistence layer; `update` fetches, parses, diffs and writes back.
#[async_trait]
pub trait Vendor: Send + Sync {
    /// Stable identifier, typically the vendor's primary domain.
    ///
    /// Embedded into queue subject names after replacing `.` with `_`, so it
    /// must never contain whitespace.
    fn name(&self) -> &'static str;

    /// Whether this extractor knows how to parse pages at the website's URL.
    ///
    /// A pure predicate; more than one vendor may claim the same URL.
    fn support(&self, web: &Website) -> bool;

    /// Fetch the page, re-compute the update signal, and persist on change.
    ///
    /// `web` is mutated in place with the newly observed title, content and
    /// update time so the caller can observe what happened. Fetch and
    /// persist failures are returned; parse failures are logged and
    /// absorbed.
    async fn update(&self, web: &mut Website) -> Result<(), VendorError>;
}

impl std::fmt::Debug for dyn Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vendor").field("name", &self.name()).finish()
    }
}
