//! u17.com — content-diff extractor.
//!
//! The fingerprint is the first two chapter spans joined by the configured
//! separator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use scraper::Html;

use crate::error::VendorError;
use crate::fetch::Fetcher;
use crate::traits::{store::WebsiteStore, vendor::Vendor};
use crate::types::config::{VendorConfig, WebsiteConfig};
use crate::types::website::{truncate_to, Website, MIN_TIME_UNIT_SECS};

pub const HOST: &str = "u17.com";

const CONTENT_SELECTOR: &str = "div.bot>div.fl>span";
const FROM_INDEX: usize = 0;
const TO_INDEX: usize = 2;

pub struct U17 {
    fetcher: Fetcher,
    store: Arc<dyn WebsiteStore>,
    conf: Arc<WebsiteConfig>,
}

impl U17 {
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
        let to = TO_INDEX.min(content.len());
        let joined = content[FROM_INDEX.min(to)..to].join(&self.conf.separator);

        if joined != web.raw_content {
            web.raw_content = joined;
            updated = true;
        }

        updated
    }
}

#[async_trait]
impl Vendor for U17 {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn vendor() -> U17 {
        U17::new(
            reqwest::Client::new(),
            Arc::new(MemoryStore::new()),
            Arc::new(WebsiteConfig::default()),
            &VendorConfig {
                max_concurrency: 1,
                fetch_interval_seconds: 0,
                max_retry: 1,
                retry_interval_seconds: 0,
            },
        )
    }

    const BODY: &str = r#"<html><head><title>Comic</title></head><body>
        <div class="bot"><div class="fl">
            <span>第10話</span><span>第9話</span><span>第8話</span>
        </div></div>
    </body></html>"#;

    #[test]
    fn test_fingerprint_takes_first_two_chapters() {
        let serv = vendor();
        let mut web = Website::new("https://u17.com/comic/1");

        assert!(serv.is_updated(&mut web, BODY));
        assert_eq!(web.title, "Comic");
        assert_eq!(web.raw_content, "第10話\n第9話");
    }

    #[test]
    fn test_single_chapter_clamps() {
        let serv = vendor();
        let mut web = Website::new("https://u17.com/comic/1");
        web.title = "Comic".to_string();

        let html = r#"<html><head><title>Comic</title></head><body>
            <div class="bot"><div class="fl"><span>第1話</span></div></div>
        </body></html>"#;

        assert!(serv.is_updated(&mut web, html));
        assert_eq!(web.raw_content, "第1話");
    }

    #[test]
    fn test_support() {
        let serv = vendor();
        assert!(serv.support(&Website::new("https://www.u17.com/comic/1")));
        assert!(!serv.support(&Website::new("https://u18.com/comic/1")));
    }
}
