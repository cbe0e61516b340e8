//! webtoons.com — content-diff extractor.
//!
//! The fingerprint is the newest episode subjects joined by the configured
//! separator; the slice width comes from `WebsiteConfig::max_date_length`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use scraper::Html;

use crate::error::VendorError;
use crate::fetch::Fetcher;
use crate::traits::{store::WebsiteStore, vendor::Vendor};
use crate::types::config::{VendorConfig, WebsiteConfig};
use crate::types::website::{truncate_to, Website, MIN_TIME_UNIT_SECS};

pub const HOST: &str = "webtoons.com";

const CONTENT_SELECTOR: &str = "ul#_listUl>li>a span.subj";

pub struct Webtoons {
    fetcher: Fetcher,
    store: Arc<dyn WebsiteStore>,
    conf: Arc<WebsiteConfig>,
}

impl Webtoons {
    pub fn new(
        client: reqwest::Client,
        store: Arc<dyn WebsiteStore>,
        conf: Arc<WebsiteConfig>,
        cfg: &VendorConfig,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(client, HOST, cfg),
            store,
            conf,
        }
    }

    fn is_updated(&self, web: &mut Website, body: &str) -> bool {
        let doc = Html::parse_document(body);
        let mut updated = super::apply_title(web, super::extract_title(&doc));

        let content = super::collect_texts(&doc, CONTENT_SELECTOR);
        let to = self.conf.max_date_length.min(content.len());
        let joined = content[..to].join(&self.conf.separator);

        if joined != web.raw_content {
            web.raw_content = joined;
            updated = true;
        }

        updated
    }
}

#[async_trait]
impl Vendor for Webtoons {
    fn name(&self) -> &'static str {
        HOST
    }

    fn support(&self, web: &Website) -> bool {
        web.host() == HOST
    }

    async fn update(&self, web: &mut Website) -> Result<(), VendorError> {
        let body = self.fetcher.fetch(web).await?;

        if self.is_updated(web, &body) {
            web.update_time = truncate_to(Utc::now(), MIN_TIME_UNIT_SECS);
            self.store.update_website(web).await?;
        }

        Ok(())
    }
}
