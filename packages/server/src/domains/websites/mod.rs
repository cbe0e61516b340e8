//! Watched-website domain: persistence and the HTTP surface.

pub mod repository;
pub mod responses;
pub mod routes;

pub use repository::PgWebsiteStore;
