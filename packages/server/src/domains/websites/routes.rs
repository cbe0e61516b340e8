//! HTTP handlers for the web-watcher surface.
//!
//! Failures are JSON `{"error": "..."}` with a 4xx/5xx status. The create
//! handler is the only synchronous entry into the update pipeline: a fresh
//! website that is more than 24 hours stale is enqueued on every supporting
//! vendor's subject before the response goes out.

use axum::extract::{Form, Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use vendors::types::website::{
    group_user_websites, truncate_to, UserWebsite, Website, MIN_TIME_UNIT_SECS,
};

use crate::domains::websites::responses::{
    ChangeWebsiteGroupResp, CreateWebsiteResp, DbStatsResp, DeleteWebsiteResp, GetUserWebsiteResp,
    GetWebsiteGroupResp, ListAllWebsiteGroupsResp, RefreshWebsiteResp, UserWebsiteResp,
};
use crate::server::app::AppState;

/// The authenticated caller, resolved by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// A handler failure rendered as `{"error": "..."}`.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// Tag every request with an id and log it once handled.
pub async fn log_request_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().to_string();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration = ?start.elapsed(),
        "request handled"
    );
    response
}

/// Require a parseable `X-USER-UUID` header and expose it as [`AuthUser`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let user_uuid = request
        .headers()
        .get("X-USER-UUID")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if Uuid::parse_str(&user_uuid).is_err() {
        return ApiError::unauthorized("unauthorized user").into_response();
    }

    request.extensions_mut().insert(AuthUser(user_uuid));
    next.run(request).await
}

#[derive(Debug, Deserialize)]
pub struct CreateWebsiteForm {
    #[serde(default)]
    pub url: String,
}

pub async fn create_website(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Form(form): Form<CreateWebsiteForm>,
) -> Result<Json<CreateWebsiteResp>, ApiError> {
    if form.url.is_empty() || !form.url.starts_with("http") {
        return Err(ApiError::bad_request("invalid params"));
    }

    let mut web = Website::new(form.url);
    state.store.create_website(&mut web).await.map_err(|err| {
        error!(error = %err, "create website failed");
        ApiError::bad_request(err.to_string())
    })?;

    let mut user_web = UserWebsite::new(web.clone(), user.0);
    state
        .store
        .create_user_website(&mut user_web)
        .await
        .map_err(|err| {
            error!(error = %err, "create user website failed");
            ApiError::bad_request(err.to_string())
        })?;

    // Only publish when the website was last observed more than 24h ago;
    // a URL someone else already watches may be fresh enough.
    if Utc::now().signed_duration_since(web.update_time) > Duration::hours(24) {
        state
            .update_tasks
            .publish(&web)
            .instrument(info_span!("website_update_job_creation"))
            .await
            .map_err(|err| {
                error!(error = %err, "publish website update task failed");
                ApiError::bad_request(err.to_string())
            })?;
    }

    Ok(Json(CreateWebsiteResp {
        message: format!("website <{}> inserted", web.title),
    }))
}

pub async fn list_all_website_groups(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ListAllWebsiteGroupsResp>, ApiError> {
    let webs = state.store.find_user_websites(&user.0).await.map_err(|err| {
        error!(error = %err, "find user websites failed");
        ApiError::bad_request(err.to_string())
    })?;

    Ok(Json(ListAllWebsiteGroupsResp::from_groups(
        group_user_websites(webs),
    )))
}

pub async fn get_website_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(group_name): Path<String>,
) -> Result<Json<GetWebsiteGroupResp>, ApiError> {
    let group = state
        .store
        .find_user_websites_by_group(&user.0, &group_name)
        .await
        .map_err(|err| {
            error!(error = %err, "find user websites by group failed");
            ApiError::bad_request(err.to_string())
        })?;

    if group.is_empty() {
        return Err(ApiError::bad_request("record not found"));
    }

    Ok(Json(GetWebsiteGroupResp {
        website_group: group.iter().map(UserWebsiteResp::from).collect(),
    }))
}

async fn resolve_user_website(
    state: &AppState,
    user: &AuthUser,
    website_uuid: &str,
) -> Result<UserWebsite, ApiError> {
    state
        .store
        .find_user_website(&user.0, website_uuid)
        .await
        .map_err(|err| {
            error!(error = %err, website_uuid, "query user website failed");
            ApiError::bad_request(err.to_string())
        })
}

pub async fn get_user_website(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(website_uuid): Path<String>,
) -> Result<Json<GetUserWebsiteResp>, ApiError> {
    let web = resolve_user_website(&state, &user, &website_uuid).await?;

    Ok(Json(GetUserWebsiteResp {
        website: UserWebsiteResp::from(&web),
    }))
}

pub async fn refresh_website(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(website_uuid): Path<String>,
) -> Result<Json<RefreshWebsiteResp>, ApiError> {
    let mut web = resolve_user_website(&state, &user, &website_uuid).await?;
    web.access_time = truncate_to(Utc::now(), MIN_TIME_UNIT_SECS);

    state.store.update_user_website(&web).await.map_err(|err| {
        error!(error = %err, "refresh user website failed");
        ApiError::internal(err.to_string())
    })?;

    Ok(Json(RefreshWebsiteResp {
        website: UserWebsiteResp::from(&web),
    }))
}

fn valid_group_name(web: &UserWebsite, group_name: &str) -> bool {
    group_name.chars().any(|c| web.website.title.contains(c))
}

#[derive(Debug, Deserialize)]
pub struct ChangeGroupForm {
    #[serde(default)]
    pub group_name: String,
}

pub async fn change_website_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(website_uuid): Path<String>,
    Form(form): Form<ChangeGroupForm>,
) -> Result<Json<ChangeWebsiteGroupResp>, ApiError> {
    let mut web = resolve_user_website(&state, &user, &website_uuid).await?;

    if !valid_group_name(&web, &form.group_name) {
        return Err(ApiError::bad_request("invalid group name"));
    }

    web.group_name = form.group_name;
    state.store.update_user_website(&web).await.map_err(|err| {
        error!(error = %err, group_name = %web.group_name, "update user website group failed");
        ApiError::bad_request(err.to_string())
    })?;

    Ok(Json(ChangeWebsiteGroupResp {
        website: UserWebsiteResp::from(&web),
    }))
}

pub async fn delete_website(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(website_uuid): Path<String>,
) -> Result<Json<DeleteWebsiteResp>, ApiError> {
    let web = resolve_user_website(&state, &user, &website_uuid).await?;

    state.store.delete_user_website(&web).await.map_err(|err| {
        error!(error = %err, "delete user website failed");
        ApiError::internal(err.to_string())
    })?;

    Ok(Json(DeleteWebsiteResp {
        message: format!("website <{}> deleted", web.website.title),
    }))
}

pub async fn db_stats(State(state): State<AppState>) -> Json<DbStatsResp> {
    let (open_connections, idle_connections) = state
        .pool
        .as_ref()
        .map(|pool| (pool.size(), pool.num_idle()))
        .unwrap_or_default();

    Json(DbStatsResp {
        open_connections,
        idle_connections,
    })
}
