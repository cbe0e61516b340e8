//! One extractor per supported vendor, plus the startup registry.
//!
//! Extractors come in two classes, distinguished by their update signal:
//!
//! - *content-diff*: extract an ordered slice of content nodes, join them
//!   with the configured separator, and compare against the stored
//!   fingerprint ([`kuaikanmanhua`], [`u17`], [`webtoons`]);
//! - *date*: extract a "last updated" string, parse it through the vendor's
//!   recognized shapes, and compare the day against the stored update time
//!   ([`manhuagui`], [`baozimh`], [`manhuaren`], [`qiman6`]).
//!
//! Both classes share the fetch and write-through logic; only the diff step
//! differs.

use std::collections::HashMap;
use std::sync::Arc;

use scraper::{Html, Selector};

use crate::error::VendorError;
use crate::traits::{store::WebsiteStore, vendor::Vendor};
use crate::types::config::{VendorConfig, WebsiteConfig};
use crate::types::website::Website;

pub mod baozimh;
pub mod kuaikanmanhua;
pub mod manhuagui;
pub mod manhuaren;
pub mod qiman6;
pub mod u17;
pub mod webtoons;

const TITLE_SELECTOR: &str = "head>title";

/// Parse a selector literal known to be valid.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("selector literals are valid CSS")
}

/// Extract the document title, empty when absent.
pub(crate) fn extract_title(doc: &Html) -> String {
    doc.select(&selector(TITLE_SELECTOR))
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Apply the monotone-initializing title rule.
///
/// A title is set once, the first time a non-empty value is observed, and
/// never overwritten afterwards.
pub(crate) fn apply_title(web: &mut Website, title: String) -> bool {
    if web.title.is_empty() && !title.is_empty() {
        web.title = title;
        return true;
    }
    false
}

/// Collect the trimmed text of every element matching `css`, in document
/// order.
pub(crate) fn collect_texts(doc: &Html, css: &str) -> Vec<String> {
    doc.select(&selector(css))
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect()
}

/// Build one extractor per configured host.
///
/// Hosts with no matching implementation are collected and reported together
/// as [`VendorError::UnknownHost`]; nothing is constructed in that case.
pub fn new_service_set(
    client: &reqwest::Client,
    store: &Arc<dyn WebsiteStore>,
    website_conf: &Arc<WebsiteConfig>,
    configs: &HashMap<String, VendorConfig>,
) -> Result<Vec<Arc<dyn Vendor>>, VendorError> {
    let mut services: Vec<Arc<dyn Vendor>> = Vec::with_capacity(configs.len());
    let mut unknown: Vec<String> = Vec::new();

    for (host, cfg) in configs {
        match host.as_str() {
            baozimh::HOST => services.push(Arc::new(baozimh::Baozimh::new(
                client.clone(),
                store.clone(),
                cfg,
            ))),
            kuaikanmanhua::HOST => services.push(Arc::new(kuaikanmanhua::Kuaikanmanhua::new(
                client.clone(),
                store.clone(),
                website_conf.clone(),
                cfg,
            ))),
            manhuagui::HOST => services.push(Arc::new(manhuagui::Manhuagui::new(
                client.clone(),
                store.clone(),
                cfg,
            ))),
            manhuaren::HOST => services.push(Arc::new(manhuaren::Manhuaren::new(
                client.clone(),
                store.clone(),
                cfg,
            ))),
            qiman6::HOST => services.push(Arc::new(qiman6::Qiman6::new(
                client.clone(),
                store.clone(),
                cfg,
            ))),
            u17::HOST => services.push(Arc::new(u17::U17::new(
                client.clone(),
                store.clone(),
                website_conf.clone(),
                cfg,
            ))),
            webtoons::HOST => services.push(Arc::new(webtoons::Webtoons::new(
                client.clone(),
                store.clone(),
                website_conf.clone(),
                cfg,
            ))),
            _ => unknown.push(host.clone()),
        }
    }

    if !unknown.is_empty() {
        unknown.sort();
        return Err(VendorError::UnknownHost {
            host: unknown.join(", "),
        });
    }

    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn service_set(
        hosts: &[&str],
    ) -> Result<Vec<Arc<dyn Vendor>>, VendorError> {
        let store: Arc<dyn WebsiteStore> = Arc::new(MemoryStore::new());
        let website_conf = Arc::new(WebsiteConfig::default());
        let configs: HashMap<String, VendorConfig> = hosts
            .iter()
            .map(|host| {
                (
                    host.to_string(),
                    VendorConfig {
                        max_concurrency: 1,
                        fetch_interval_seconds: 0,
                        max_retry: 1,
                        retry_interval_seconds: 0,
                    },
                )
            })
            .collect();

        new_service_set(&reqwest::Client::new(), &store, &website_conf, &configs)
    }

    #[test]
    fn test_new_service_set_builds_known_hosts() {
        let services = service_set(&[
            "baozimh.com",
            "kuaikanmanhua.com",
            "manhuagui.com",
            "manhuaren.com",
            "qiman6.com",
            "u17.com",
            "webtoons.com",
        ])
        .unwrap();

        let mut names: Vec<&str> = services.iter().map(|s| s.name()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "baozimh.com",
                "kuaikanmanhua.com",
                "manhuagui.com",
                "manhuaren.com",
                "qiman6.com",
                "u17.com",
                "webtoons.com",
            ]
        );
    }

    #[test]
    fn test_new_service_set_rejects_unknown_hosts() {
        let err = service_set(&["manhuagui.com", "nonsense.example"]).unwrap_err();
        match err {
            VendorError::UnknownHost { host } => assert_eq!(host, "nonsense.example"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_config_yields_empty_set() {
        assert!(service_set(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_vendor_names_form_subject_tokens() {
        let services = service_set(&["manhuagui.com", "webtoons.com"]).unwrap();
        for service in services {
            let name = service.name();
            assert!(!name.contains(char::is_whitespace));
            let token = name.replace('.', "_");
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }
}
