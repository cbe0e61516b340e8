//! The watched website and its per-user view.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Storage quantum for website timestamps, in seconds.
pub const MIN_TIME_UNIT_SECS: i64 = 5;

/// Truncate a moment to a whole multiple of `quantum_secs` since the epoch.
pub fn truncate_to(t: DateTime<Utc>, quantum_secs: i64) -> DateTime<Utc> {
    let ts = t.timestamp();
    let floored = ts - ts.rem_euclid(quantum_secs);
    Utc.timestamp_opt(floored, 0).single().unwrap_or(t)
}

/// Truncate a moment to the start of its UTC day.
pub fn day_floor(t: DateTime<Utc>) -> DateTime<Utc> {
    truncate_to(t, 24 * 60 * 60)
}

/// Lifecycle state of a watched website.
///
/// Only `active` websites participate in batch updates; `inactive` websites
/// are hidden from every user-facing lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebsiteStatus {
    Active,
    ReadOnly,
    Inactive,
}

impl std::fmt::Display for WebsiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebsiteStatus::Active => write!(f, "active"),
            WebsiteStatus::ReadOnly => write!(f, "read_only"),
            WebsiteStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for WebsiteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(WebsiteStatus::Active),
            "read_only" => Ok(WebsiteStatus::ReadOnly),
            "inactive" => Ok(WebsiteStatus::Inactive),
            other => Err(format!("invalid website status: {other}")),
        }
    }
}

/// A watched third-party index page.
///
/// `raw_content` is the change fingerprint: a small number of parsed
/// fragments joined by the configured separator. `update_time` is the most
/// recent moment the remote page was observed to have changed, always UTC
/// and truncated to the writing vendor's quantum.
#[derive(Debug, Clone, PartialEq)]
pub struct Website {
    pub uuid: String,
    pub url: String,
    pub title: String,
    pub raw_content: String,
    pub update_time: DateTime<Utc>,
    pub status: WebsiteStatus,
}

impl Website {
    /// Create a new website for a freshly registered URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            url: url.into(),
            title: String::new(),
            raw_content: String::new(),
            update_time: truncate_to(Utc::now(), MIN_TIME_UNIT_SECS),
            status: WebsiteStatus::Active,
        }
    }

    /// The full hostname of the registered URL, empty when unparseable.
    pub fn full_host(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// The registrable host: the last two labels of the hostname.
    ///
    /// `https://www.manhuagui.com/comic/1` and `https://tw.manhuagui.com/x`
    /// both map to `manhuagui.com`; vendors match on this.
    pub fn host(&self) -> String {
        let full = self.full_host();
        if full.is_empty() {
            return full;
        }
        let labels: Vec<&str> = full.split('.').collect();
        let start = labels.len().saturating_sub(2);
        labels[start..].join(".")
    }

    /// Split the stored fingerprint back into fragments.
    pub fn content(&self, separator: &str) -> Vec<String> {
        self.raw_content
            .split(separator)
            .map(str::to_string)
            .collect()
    }
}

/// A user's view of a website: per-user access marker and grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct UserWebsite {
    pub website_uuid: String,
    pub user_uuid: String,
    pub group_name: String,
    pub access_time: DateTime<Utc>,
    pub website: Website,
}

impl UserWebsite {
    /// Link a user to a website. The group defaults to the website title.
    pub fn new(website: Website, user_uuid: impl Into<String>) -> Self {
        Self {
            website_uuid: website.uuid.clone(),
            user_uuid: user_uuid.into(),
            group_name: website.title.clone(),
            access_time: truncate_to(Utc::now(), 1),
            website,
        }
    }
}

/// Websites sharing one group name.
pub type WebsiteGroup = Vec<UserWebsite>;

/// All of a user's websites, grouped by group name in first-seen order.
pub type WebsiteGroups = Vec<WebsiteGroup>;

/// Group a user's websites by group name, preserving first-seen group order.
pub fn group_user_websites(webs: Vec<UserWebsite>) -> WebsiteGroups {
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut groups: WebsiteGroups = Vec::new();

    for web in webs {
        match index.get(&web.group_name) {
            Some(&i) => groups[i].push(web),
            None => {
                index.insert(web.group_name.clone(), groups.len());
                groups.push(vec![web]);
            }
        }
    }

    groups
}
