//! baozimh.com — date-class extractor.
//!
//! The supporting-text line wraps its date in `(… 更新)`. Inside the wrapper
//! the vendor serves either an absolute `YYYY年MM月DD日` date or a relative
//! `N分鐘前` / `N小時前` offset.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use scraper::Html;
use tracing::{error, warn};

use crate::error::VendorError;
use crate::fetch::Fetcher;
use crate::traits::{store::WebsiteStore, vendor::Vendor};
use crate::types::config::VendorConfig;
use crate::types::website::{day_floor, Website};

pub const HOST: &str = "baozimh.com";

const DATE_SELECTOR: &str = "div.supporting-text>div>span>em";
const DATE_FORMAT: &str = "%Y年%m月%d日";

pub struct Baozimh {
    fetcher: Fetcher,
    store: Arc<dyn WebsiteStore>,
    date_wrapper: Regex,
}

impl Baozimh {
    pub fn new(client: reqwest::Client, store: Arc<dyn WebsiteStore>, cfg: &VendorConfig) -> Self {
        Self {
            fetcher: Fetcher::new(client, HOST, cfg),
            store,
            date_wrapper: Regex::new(r"\((.*) 更新\)").expect("literal pattern"),
        }
    }

    fn parse_update_time(&self, raw: &str) -> Option<DateTime<Utc>> {
        if let Some(stripped) = raw.strip_suffix("分鐘前") {
            match stripped.trim().parse::<i64>() {
                Ok(minutes) => return Some(Utc::now() - Duration::minutes(minutes)),
                Err(err) => {
                    error!(error = %err, date = %raw, vendor = HOST, "failed to parse update time");
                    return None;
                }
            }
        }

        if let Some(stripped) = raw.strip_suffix("小時前") {
            match stripped.trim().parse::<i64>() {
                Ok(hours) => return Some(Utc::now() - Duration::hours(hours)),
                Err(err) => {
                    error!(error = %err, date = %raw, vendor = HOST, "failed to parse update time");
                    return None;
                }
            }
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

        let Some(wrapped) = self
            .date_wrapper
            .captures(&date_text)
            .and_then(|caps| caps.get(1))
        else {
            warn!(update_time_str = %date_text, vendor = HOST, "cannot find update time str");
            return updated;
        };

        if let Some(parsed) = self.parse_update_time(wrapped.as_str()) {
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
impl Vendor for Baozimh {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use chrono::TimeZone;

    fn vendor() -> Baozimh {
        Baozimh::new(
            reqwest::Client::new(),
            Arc::new(MemoryStore::new()),
            &VendorConfig {
                max_concurrency: 1,
                fetch_interval_seconds: 0,
                max_retry: 1,
                retry_interval_seconds: 0,
            },
        )
    }

    fn website() -> Website {
        let mut web = Website::new("https://www.baozimh.com/comic/x");
        web.update_time = Utc.timestamp_opt(0, 0).unwrap();
        web
    }

    fn body(date_line: &str) -> String {
        format!(
            r#"<html><head><title>Comic</title></head><body>
              <div class="supporting-text"><div><span><em>({date_line} 更新)</em></span></div></div>
            </body></html>"#
        )
    }

    #[test]
    fn test_absolute_date() {
        let serv = vendor();
        let mut web = website();

        assert!(serv.is_updated(&mut web, &body("2023年06月15日")));
        assert_eq!(
            web.update_time,
            Utc.with_ymd_and_hms(2023, 6, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_minutes_ago_maps_to_today() {
        let serv = vendor();
        let mut web = website();

        assert!(serv.is_updated(&mut web, &body("5分鐘前")));
        assert_eq!(web.update_time, day_floor(Utc::now() - Duration::minutes(5)));
    }

    #[test]
    fn test_hours_ago_maps_to_day_floor() {
        let serv = vendor();
        let mut web = website();

        assert!(serv.is_updated(&mut web, &body("3小時前")));
        assert_eq!(web.update_time, day_floor(Utc::now() - Duration::hours(3)));
    }

    #[test]
    fn test_missing_wrapper_keeps_update_time() {
        let serv = vendor();
        let mut web = website();
        web.title = "t".to_string();
        let before = web.update_time;

        let html = r#"<html><head><title>Comic</title></head><body>
            <div class="supporting-text"><div><span><em>soon</em></span></div></div>
        </body></html>"#;

        assert!(!serv.is_updated(&mut web, html));
        assert_eq!(web.update_time, before);
    }

    #[test]
    fn test_support() {
        let serv = vendor();
        assert!(serv.support(&Website::new("https://baozimh.com/comic/x")));
        assert!(!serv.support(&Website::new("https://manhuagui.com/comic/x")));
    }
}
