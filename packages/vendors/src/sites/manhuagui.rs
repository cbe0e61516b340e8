//! manhuagui.com — date-class extractor.
//!
//! The index page carries an absolute `YYYY-MM-DD` date in the status line.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use scraper::Html;
use tracing::error;

use crate::error::VendorError;
use crate::fetch::Fetcher;
use crate::traits::{store::WebsiteStore, vendor::Vendor};
use crate::types::config::VendorConfig;
use crate::types::website::Website;

pub const HOST: &str = "manhuagui.com";

const DATE_SELECTOR: &str = "li.status>span>span.red:nth-child(3)";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Manhuagui {
    fetcher: Fetcher,
    store: Arc<dyn WebsiteStore>,
}

impl Manhuagui {
    pub fn new(client: reqwest::Client, store: Arc<dyn WebsiteStore>, cfg: &VendorConfig) -> Self {
        Self {
            fetcher: Fetcher::new(client, HOST, cfg),
            store,
        }
    }

    fn is_updated(&self, web: &mut Website, body: &str) -> bool {
        let doc = Html::parse_document(body);
        let mut updated = super::apply_title(web, super::extract_title(&doc));

        let date_text = doc
            .select(&super::selector(DATE_SELECTOR))
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        match NaiveDate::parse_from_str(&date_text, DATE_FORMAT) {
            Ok(date) => {
                let update_time = date.and_time(NaiveTime::MIN).and_utc();
                if update_time > web.update_time {
                    web.update_time = update_time;
                    updated = true;
                }
            }
            Err(err) => {
                error!(error = %err, date = %date_text, vendor = HOST, "failed to parse update time");
            }
        }

        updated
    }
}

#[async_trait]
impl Vendor for Manhuagui {
    fn name(&self) -> &'static str {
        HOST
    }

    fn support(&self, web: &Website) -> bool {
        web.host() == HOST
    }

    async fn update(&self, web: &mut Website) -> Result<(), VendorError> {
        let body = self.fetcher.fetch(web).await?;

        if self.is_updated(web, &body) {
            self.store.update_website(web).await?;
        }

        Ok(())
    }
}
