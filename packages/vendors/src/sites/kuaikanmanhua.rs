//! kuaikanmanhua.com — content-diff extractor.
//!
//! The fingerprint is the first five episode blurbs joined by the configured
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

pub const HOST: &str = "kuaikanmanhua.com";

const CONTENT_SELECTOR: &str = "div.topic-episode>div.text-warp>div.detail";
const FROM_INDEX: usize = 0;
const TO_INDEX: usize = 5;

pub struct Kuaikanmanhua {
    fetcher: Fetcher,
    store: Arc<dyn WebsiteStore>,
    conf: Arc<WebsiteConfig>,
}

impl Kuaikanmanhua {
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
impl Vendor for Kuaikanmanhua {
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

    fn vendor() -> Kuaikanmanhua {
        Kuaikanmanhua::new(
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

    fn body(details: &[&str]) -> String {
        let items: String = details
            .iter()
            .map(|d| {
                format!(
                    r#"<div class="topic-episode"><div class="text-warp"><div class="detail">{d}</div></div></div>"#
                )
            })
            .collect();
        format!("<html><head><title>Comic</title></head><body>{items}</body></html>")
    }

    #[test]
    fn test_content_slice_is_clamped_to_available_items() {
        let serv = vendor();
        let mut web = Website::new("https://kuaikanmanhua.com/web/topic/1");

        assert!(serv.is_updated(&mut web, &body(&["ep2", "ep1"])));
        assert_eq!(web.raw_content, "ep2\nep1");
    }

    #[test]
    fn test_content_slice_takes_first_five() {
        let serv = vendor();
        let mut web = Website::new("https://kuaikanmanhua.com/web/topic/1");

        let updated = serv.is_updated(
            &mut web,
            &body(&["ep6", "ep5", "ep4", "ep3", "ep2", "ep1"]),
        );
        assert!(updated);
        assert_eq!(web.raw_content, "ep6\nep5\nep4\nep3\nep2");
    }

    #[test]
    fn test_unchanged_content_is_not_dirty() {
        let serv = vendor();
        let mut web = Website::new("https://kuaikanmanhua.com/web/topic/1");
        web.title = "Comic".to_string();
        web.raw_content = "ep2\nep1".to_string();

        assert!(!serv.is_updated(&mut web, &body(&["ep2", "ep1"])));
    }

    #[test]
    fn test_no_content_nodes_yields_empty_fingerprint() {
        let serv = vendor();
        let mut web = Website::new("https://kuaikanmanhua.com/web/topic/1");
        web.title = "Comic".to_string();

        let html = "<html><head><title>Comic</title></head><body></body></html>";
        assert!(!serv.is_updated(&mut web, html));
        assert_eq!(web.raw_content, "");
    }
}
