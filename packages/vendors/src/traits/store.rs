//! Persistence contract for watched websites and user links.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::website::{UserWebsite, Website, WebsiteGroup};

/// Storage backend for websites and per-user links.
///
/// The pipeline core only writes through `update_website`; the HTTP layer
/// uses the rest. Implementations must keep `inactive` websites out of every
/// user-facing lookup and return only `active` ones from `find_websites`.
#[async_trait]
pub trait WebsiteStore: Send + Sync {
    /// Insert a website. On URL collision the caller's value is overwritten
    /// with the existing row and no error is returned.
    async fn create_website(&self, web: &mut Website) -> Result<(), StoreError>;

    /// Persist a mutated website. Missing rows are an error.
    async fn update_website(&self, web: &Website) -> Result<(), StoreError>;

    async fn delete_website(&self, web: &Website) -> Result<(), StoreError>;

    /// All websites eligible for batch updates (status `active` only).
    async fn find_websites(&self) -> Result<Vec<Website>, StoreError>;

    /// Look up one website by UUID; `inactive` rows read as not found.
    async fn find_website(&self, uuid: &str) -> Result<Website, StoreError>;

    async fn create_user_website(&self, web: &mut UserWebsite) -> Result<(), StoreError>;

    async fn update_user_website(&self, web: &UserWebsite) -> Result<(), StoreError>;

    async fn delete_user_website(&self, web: &UserWebsite) -> Result<(), StoreError>;

    /// Every link of one user, excluding `inactive` websites.
    async fn find_user_websites(&self, user_uuid: &str) -> Result<Vec<UserWebsite>, StoreError>;

    async fn find_user_websites_by_group(
        &self,
        user_uuid: &str,
        group: &str,
    ) -> Result<WebsiteGroup, StoreError>;

    async fn find_user_website(
        &self,
        user_uuid: &str,
        website_uuid: &str,
    ) -> Result<UserWebsite, StoreError>;
}
