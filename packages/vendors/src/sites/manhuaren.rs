//! manhuaren.com — date-class extractor.
//!
//! The detail list reports either a relative day (今天 / 昨天 / 前天), a
//! same-year `MM月DD号` date, or an absolute `YYYY-MM-DD` date.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use scraper::Html;
use tracing::error;

use crate::error::VendorError;
use crate::fetch::Fetcher;
use crate::traits::{store::WebsiteStore, vendor::Vendor};
use crate::types::config::VendorConfig;
use crate::types::website::{day_floor, Website};

pub const HOST: &str = "manhuaren.com";

const DATE_SELECTOR: &str = "span.detail-list-title-3";
const DATE_FORMAT: &str = "%Y-%m-%d";
const SAME_YEAR_DATE_FORMAT: &str = "%Y-%m月%d号";

pub struct Manhuaren {
    fetcher: Fetcher,
    store: Arc<dyn WebsiteStore>,
}

impl Manhuaren {
    pub fn new(client: reqwest::Client, store: Arc<dyn WebsiteStore>, cfg: &VendorConfig) -> Self {
        Self {
            fetcher: Fetcher::new(client, HOST, cfg),
            store,
        }
    }

    fn parse_update_time(&self, raw: &str) -> Option<DateTime<Utc>> {
        if raw.contains('天') {
            if raw.contains("今天") {
                return Some(Utc::now());
            }
            if raw.contains("昨天") {
                return Some(Utc::now() - Duration::hours(24));
            }
            if raw.contains("前天") {
                return Some(Utc::now() - Duration::hours(48));
            }
            return None;
        }

        if raw.contains('月') && raw.contains('号') {
            let with_year = format!("{}-{}", Utc::now().year(), raw);
            return match NaiveDate::parse_from_str(&with_year, SAME_YEAR_DATE_FORMAT) {
                Ok(date) => Some(date.and_time(NaiveTime::MIN).and_utc()),
                Err(err) => {
                    error!(error = %err, date = %raw, vendor = HOST, "failed to parse update time");
                    None
                }
            };
        }

        match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            Ok(date) => Some(date.and_time(NaiveTime::MIN).and_utc()),
            Err(err) => {
                error!(error = %err, date = %raw, vendor = HOST, "failed to parse update time");
                None
            }
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

        if let Some(parsed) = self.parse_update_time(&date_text) {
            let update_time = day_floor(parsed);
            if update_time > web.update_time {
                web.update_time = update_time;
                updated = true;
            }
        }

        updated
    }
}

#[async_trait]
impl Vendor for Manhuaren {
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
