//! HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vendors::types::website::{UserWebsite, WebsiteGroups};

#[derive(Debug, Serialize)]
pub struct UserWebsiteResp {
    pub uuid: String,
    pub url: String,
    pub title: String,
    pub group_name: String,
    pub update_time: DateTime<Utc>,
    pub access_time: DateTime<Utc>,
}

impl From<&UserWebsite> for UserWebsiteResp {
    fn from(web: &UserWebsite) -> Self {
        Self {
            uuid: web.website_uuid.clone(),
            url: web.website.url.clone(),
            title: web.website.title.clone(),
            group_name: web.group_name.clone(),
            update_time: web.website.update_time,
            access_time: web.access_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListAllWebsiteGroupsResp {
    pub website_groups: Vec<Vec<UserWebsiteResp>>,
}

impl ListAllWebsiteGroupsResp {
    pub fn from_groups(groups: WebsiteGroups) -> Self {
        Self {
            website_groups: groups
                .iter()
                .map(|group| group.iter().map(UserWebsiteResp::from).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetWebsiteGroupResp {
    pub website_group: Vec<UserWebsiteResp>,
}

#[derive(Debug, Serialize)]
pub struct CreateWebsiteResp {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GetUserWebsiteResp {
    pub website: UserWebsiteResp,
}

#[derive(Debug, Serialize)]
pub struct RefreshWebsiteResp {
    pub website: UserWebsiteResp,
}

#[derive(Debug, Serialize)]
pub struct DeleteWebsiteResp {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChangeWebsiteGroupResp {
    pub website: UserWebsiteResp,
}

#[derive(Debug, Serialize)]
pub struct DbStatsResp {
    pub open_connections: u32,
    pub idle_connections: usize,
}
