//! Postgres implementation of the website store.
//!
//! Timestamps are stored in UTC and read back truncated to the 5-second
//! storage quantum. `find_websites` feeds the batch dispatcher and therefore
//! returns `active` rows only; single-row lookups hide `inactive` rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vendors::error::StoreError;
use vendors::traits::store::WebsiteStore;
use vendors::types::website::{
    group_user_websites, truncate_to, UserWebsite, Website, WebsiteGroup, WebsiteStatus,
    MIN_TIME_UNIT_SECS,
};

pub struct PgWebsiteStore {
    pool: PgPool,
}

impl PgWebsiteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WebsiteRow {
    uuid: String,
    url: String,
    title: String,
    content: String,
    update_time: DateTime<Utc>,
    status: String,
}

impl WebsiteRow {
    fn into_website(self) -> Website {
        Website {
            uuid: self.uuid,
            url: self.url,
            title: self.title,
            raw_content: self.content,
            update_time: truncate_to(self.update_time.with_timezone(&Utc), MIN_TIME_UNIT_SECS),
            status: self.status.parse().unwrap_or(WebsiteStatus::Active),
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserWebsiteRow {
    user_uuid: String,
    website_uuid: String,
    access_time: DateTime<Utc>,
    group_name: String,
    url: String,
    title: String,
    content: String,
    update_time: DateTime<Utc>,
    status: String,
}

impl UserWebsiteRow {
    fn into_user_website(self) -> UserWebsite {
        UserWebsite {
            website: Website {
                uuid: self.website_uuid.clone(),
                url: self.url,
                title: self.title,
                raw_content: self.content,
                update_time: truncate_to(self.update_time.with_timezone(&Utc), MIN_TIME_UNIT_SECS),
                status: self.status.parse().unwrap_or(WebsiteStatus::Active),
            },
            website_uuid: self.website_uuid,
            user_uuid: self.user_uuid,
            group_name: self.group_name,
            access_time: truncate_to(self.access_time.with_timezone(&Utc), MIN_TIME_UNIT_SECS),
        }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::backend(other),
    }
}

const USER_WEBSITE_SELECT: &str = r#"
    SELECT uw.user_uuid, uw.website_uuid, uw.access_time, uw.group_name,
           w.url, w.title, w.content, w.update_time, w.status
    FROM user_websites uw
    JOIN websites w ON w.uuid = uw.website_uuid
"#;

#[async_trait]
impl WebsiteStore for PgWebsiteStore {
    async fn create_website(&self, web: &mut Website) -> Result<(), StoreError> {
        // On URL collision the existing row wins and is handed back to the
        // caller; a second create of the same URL is a data no-op. The
        // update_time column keeps its maximally-stale default on insert so
        // the create path primes the first scrape.
        let row = sqlx::query_as::<_, WebsiteRow>(
            r#"
            INSERT INTO websites (uuid, url, title, content, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (url) DO UPDATE SET url = excluded.url
            RETURNING uuid, url, title, content, update_time, status
            "#,
        )
        .bind(&web.uuid)
        .bind(&web.url)
        .bind(&web.title)
        .bind(&web.raw_content)
        .bind(web.status.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        *web = row.into_website();
        Ok(())
    }

    async fn update_website(&self, web: &Website) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE websites
            SET title = $2, content = $3, update_time = $4, status = $5
            WHERE uuid = $1
            "#,
        )
        .bind(&web.uuid)
        .bind(&web.title)
        .bind(&web.raw_content)
        .bind(web.update_time)
        .bind(web.status.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_website(&self, web: &Website) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM websites WHERE uuid = $1")
            .bind(&web.uuid)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn find_websites(&self) -> Result<Vec<Website>, StoreError> {
        let rows = sqlx::query_as::<_, WebsiteRow>(
            "SELECT uuid, url, title, content, update_time, status FROM websites WHERE status = 'active'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(WebsiteRow::into_website).collect())
    }

    async fn find_website(&self, uuid: &str) -> Result<Website, StoreError> {
        sqlx::query_as::<_, WebsiteRow>(
            r#"
            SELECT uuid, url, title, content, update_time, status
            FROM websites WHERE uuid = $1 AND status != 'inactive'
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(WebsiteRow::into_website)
        .ok_or(StoreError::NotFound)
    }

    async fn create_user_website(&self, web: &mut UserWebsite) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_websites (user_uuid, website_uuid, access_time, group_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_uuid, website_uuid) DO NOTHING
            "#,
        )
        .bind(&web.user_uuid)
        .bind(&web.website_uuid)
        .bind(web.access_time)
        .bind(&web.group_name)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        web.website = self.find_website(&web.website_uuid).await?;
        Ok(())
    }

    async fn update_user_website(&self, web: &UserWebsite) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE user_websites
            SET access_time = $3, group_name = $4
            WHERE user_uuid = $1 AND website_uuid = $2
            "#,
        )
        .bind(&web.user_uuid)
        .bind(&web.website_uuid)
        .bind(web.access_time)
        .bind(&web.group_name)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user_website(&self, web: &UserWebsite) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM user_websites WHERE user_uuid = $1 AND website_uuid = $2")
            .bind(&web.user_uuid)
            .bind(&web.website_uuid)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn find_user_websites(&self, user_uuid: &str) -> Result<Vec<UserWebsite>, StoreError> {
        let rows = sqlx::query_as::<_, UserWebsiteRow>(&format!(
            "{USER_WEBSITE_SELECT} WHERE uw.user_uuid = $1 AND w.status != 'inactive' ORDER BY uw.access_time DESC"
        ))
        .bind(user_uuid)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows
            .into_iter()
            .map(UserWebsiteRow::into_user_website)
            .collect())
    }

    async fn find_user_websites_by_group(
        &self,
        user_uuid: &str,
        group: &str,
    ) -> Result<WebsiteGroup, StoreError> {
        let rows = sqlx::query_as::<_, UserWebsiteRow>(&format!(
            "{USER_WEBSITE_SELECT} WHERE uw.user_uuid = $1 AND uw.group_name = $2 AND w.status != 'inactive'"
        ))
        .bind(user_uuid)
        .bind(group)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let webs: Vec<UserWebsite> = rows
            .into_iter()
            .map(UserWebsiteRow::into_user_website)
            .collect();

        Ok(group_user_websites(webs).into_iter().next().unwrap_or_default())
    }

    async fn find_user_website(
        &self,
        user_uuid: &str,
        website_uuid: &str,
    ) -> Result<UserWebsite, StoreError> {
        sqlx::query_as::<_, UserWebsiteRow>(&format!(
            "{USER_WEBSITE_SELECT} WHERE uw.user_uuid = $1 AND uw.website_uuid = $2 AND w.status != 'inactive'"
        ))
        .bind(user_uuid)
        .bind(website_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(UserWebsiteRow::into_user_website)
        .ok_or(StoreError::NotFound)
    }
}
