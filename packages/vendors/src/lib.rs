//! Vendor extractors for the web-watch update pipeline.
//!
//! Each supported vendor (one family of comic/manga index pages) implements
//! the [`Vendor`] trait: decide support for a URL, fetch the page under the
//! vendor's rate limits, parse it, diff against the stored snapshot, and
//! write back through the [`WebsiteStore`] when something changed.
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (Vendor, WebsiteStore)
//! - [`types`] - Watched-website data types and per-vendor configuration
//! - [`sites`] - One extractor per supported vendor, plus the registry
//! - [`fetch`] - Shared rate-limited page fetcher
//! - [`testing`] - In-memory store and scripted vendor for tests

pub mod error;
pub mod fetch;
pub mod sites;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{StoreError, VendorError};
pub use traits::{store::WebsiteStore, vendor::Vendor};
pub use types::{
    config::{VendorConfig, WebsiteConfig},
    website::{UserWebsite, Website, WebsiteGroup, WebsiteGroups, WebsiteStatus},
};
