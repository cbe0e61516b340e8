//! Typed errors for the vendor extractor library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so that callers can
//! match on the failure class: fetch and persist errors propagate out of an
//! update, parse errors never do.

use thiserror::Error;

/// Errors returned by vendor extractors.
#[derive(Debug, Error)]
pub enum VendorError {
    /// HTTP response outside [200, 300) after all retries.
    #[error("fetch website failed: invalid status code ({status})")]
    InvalidStatusCode { status: u16 },

    /// No registered vendor supports the website's URL.
    #[error("website is not supported")]
    NotSupportedWebsite,

    /// Configuration referenced a vendor this build does not implement.
    #[error("unknown host: {host}")]
    UnknownHost { host: String },

    /// Transport-level HTTP failure.
    #[error("fetch website failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Write-through to the persistence layer failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced by [`crate::traits::store::WebsiteStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced row does not exist (or is not visible).
    #[error("record not found")]
    NotFound,

    /// Any other backend failure.
    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap an arbitrary backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Database(Box::new(err))
    }
}
