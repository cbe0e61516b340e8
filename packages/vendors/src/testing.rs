//! Test doubles for the pipeline's collaborators.
//!
//! [`MemoryStore`] is a full in-memory [`WebsiteStore`] that records every
//! write-through; [`ScriptedVendor`] is a [`Vendor`] with canned support and
//! update behavior. Both are used by this crate's unit tests and by the
//! server crate's task and route tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::error::{StoreError, VendorError};
use crate::traits::{store::WebsiteStore, vendor::Vendor};
use crate::types::website::{group_user_websites, UserWebsite, Website, WebsiteGroup, WebsiteStatus};

/// What a freshly inserted row's update_time reads back as: maximally stale,
/// matching the production column default.
pub fn zero_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()
}

/// In-memory store that tracks websites, user links and update calls.
#[derive(Default)]
pub struct MemoryStore {
    websites: RwLock<Vec<Website>>,
    user_websites: RwLock<Vec<UserWebsite>>,
    update_calls: RwLock<Vec<Website>>,
    fail_updates: AtomicBool,
    fail_finds: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a website directly, bypassing collision handling.
    pub fn seed_website(&self, web: Website) {
        self.websites
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(web);
    }

    pub fn seed_user_website(&self, web: UserWebsite) {
        self.user_websites
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(web);
    }

    /// Make every subsequent `update_website` fail.
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent `find_websites` fail.
    pub fn fail_finds(&self) {
        self.fail_finds.store(true, Ordering::SeqCst);
    }

    /// Every website currently stored, regardless of status.
    pub fn all_websites(&self) -> Vec<Website> {
        self.websites
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Snapshots passed to `update_website`, in call order.
    pub fn update_calls(&self) -> Vec<Website> {
        self.update_calls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn attach_website(&self, mut link: UserWebsite) -> Option<UserWebsite> {
        let websites = self.websites.read().unwrap_or_else(|e| e.into_inner());
        let web = websites
            .iter()
            .find(|w| w.uuid == link.website_uuid && w.status != WebsiteStatus::Inactive)?;
        link.website = web.clone();
        Some(link)
    }
}

#[async_trait]
impl WebsiteStore for MemoryStore {
    async fn create_website(&self, web: &mut Website) -> Result<(), StoreError> {
        let mut websites = self.websites.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = websites.iter().find(|w| w.url == web.url) {
            *web = existing.clone();
            return Ok(());
        }
        web.update_time = zero_time();
        websites.push(web.clone());
        Ok(())
    }

    async fn update_website(&self, web: &Website) -> Result<(), StoreError> {
        self.update_calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(web.clone());

        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::backend(std::io::Error::other(
                "scripted update failure",
            )));
        }

        let mut websites = self.websites.write().unwrap_or_else(|e| e.into_inner());
        match websites.iter_mut().find(|w| w.uuid == web.uuid) {
            Some(stored) => {
                *stored = web.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_website(&self, web: &Website) -> Result<(), StoreError> {
        self.websites
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|w| w.uuid != web.uuid);
        Ok(())
    }

    async fn find_websites(&self) -> Result<Vec<Website>, StoreError> {
        if self.fail_finds.load(Ordering::SeqCst) {
            return Err(StoreError::backend(std::io::Error::other(
                "scripted find failure",
            )));
        }

        Ok(self
            .websites
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|w| w.status == WebsiteStatus::Active)
            .cloned()
            .collect())
    }

    async fn find_website(&self, uuid: &str) -> Result<Website, StoreError> {
        self.websites
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|w| w.uuid == uuid && w.status != WebsiteStatus::Inactive)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_user_website(&self, web: &mut UserWebsite) -> Result<(), StoreError> {
        self.user_websites
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(web.clone());

        *web = self
            .attach_website(web.clone())
            .ok_or(StoreError::NotFound)?;
        Ok(())
    }

    async fn update_user_website(&self, web: &UserWebsite) -> Result<(), StoreError> {
        let mut links = self.user_websites.write().unwrap_or_else(|e| e.into_inner());
        match links
            .iter_mut()
            .find(|l| l.user_uuid == web.user_uuid && l.website_uuid == web.website_uuid)
        {
            Some(stored) => {
                *stored = web.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_user_website(&self, web: &UserWebsite) -> Result<(), StoreError> {
        self.user_websites
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|l| !(l.user_uuid == web.user_uuid && l.website_uuid == web.website_uuid));
        Ok(())
    }

    async fn find_user_websites(&self, user_uuid: &str) -> Result<Vec<UserWebsite>, StoreError> {
        Ok(self
            .user_websites
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|l| l.user_uuid == user_uuid)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|l| self.attach_website(l))
            .collect())
    }

    async fn find_user_websites_by_group(
        &self,
        user_uuid: &str,
        group: &str,
    ) -> Result<WebsiteGroup, StoreError> {
        let webs = self.find_user_websites(user_uuid).await?;
        Ok(group_user_websites(webs)
            .into_iter()
            .find(|g| g.first().map(|w| w.group_name.as_str()) == Some(group))
            .unwrap_or_default())
    }

    async fn find_user_website(
        &self,
        user_uuid: &str,
        website_uuid: &str,
    ) -> Result<UserWebsite, StoreError> {
        self.user_websites
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|l| l.user_uuid == user_uuid && l.website_uuid == website_uuid)
            .cloned()
            .and_then(|l| self.attach_website(l))
            .ok_or(StoreError::NotFound)
    }
}

/// A vendor with canned behavior for task and route tests.
pub struct ScriptedVendor {
    name: &'static str,
    supported: bool,
    fail_update: AtomicBool,
    title_on_update: RwLock<Option<String>>,
    update_calls: RwLock<Vec<Website>>,
}

impl ScriptedVendor {
    pub fn new(name: &'static str, supported: bool) -> Self {
        Self {
            name,
            supported,
            fail_update: AtomicBool::new(false),
            title_on_update: RwLock::new(None),
            update_calls: RwLock::new(Vec::new()),
        }
    }

    /// Make every subsequent `update` return an error.
    pub fn fail_update(self) -> Self {
        self.fail_update.store(true, Ordering::SeqCst);
        self
    }

    /// Make `update` observe the given title, as a fetched page would.
    pub fn title_on_update(self, title: impl Into<String>) -> Self {
        *self
            .title_on_update
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(title.into());
        self
    }

    /// Snapshots passed to `update`, in call order.
    pub fn update_calls(&self) -> Vec<Website> {
        self.update_calls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Vendor for ScriptedVendor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn support(&self, _web: &Website) -> bool {
        self.supported
    }

    async fn update(&self, web: &mut Website) -> Result<(), VendorError> {
        self.update_calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(web.clone());

        if self.fail_update.load(Ordering::SeqCst) {
            return Err(VendorError::InvalidStatusCode { status: 500 });
        }

        if let Some(title) = self
            .title_on_update
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            if web.title.is_empty() {
                web.title = title;
            }
        }

        Ok(())
    }
}
