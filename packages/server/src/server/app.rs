//! Application setup and server configuration.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use vendors::traits::store::WebsiteStore;

use crate::domains::websites::routes::{
    auth_middleware, change_website_group, create_website, db_stats, delete_website,
    get_user_website, get_website_group, list_all_website_groups, log_request_middleware,
    refresh_website,
};
use crate::tasks::website_update::WebsiteUpdateTasks;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WebsiteStore>,
    pub update_tasks: Arc<WebsiteUpdateTasks>,
    /// Present in production for the db-stats endpoint; absent in tests.
    pub pool: Option<PgPool>,
}

/// Build the Axum application router
pub fn build_app(state: AppState, prefix: &str) -> Router {
    let website_routes = Router::new()
        .route("/websites", post(create_website))
        .route("/websites/groups", get(list_all_website_groups))
        .route("/websites/groups/{group_name}", get(get_website_group))
        .route("/websites/db-stats", get(db_stats))
        .route(
            "/websites/{website_uuid}",
            get(get_user_website).delete(delete_website),
        )
        .route("/websites/{website_uuid}/refresh", put(refresh_website))
        .route(
            "/websites/{website_uuid}/change-group",
            put(change_website_group),
        )
        .layer(middleware::from_fn(auth_middleware))
        .with_state(state);

    Router::new()
        .nest(prefix, website_routes)
        .layer(middleware::from_fn(log_request_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Resolve when the process receives ctrl-c or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "install ctrl-c handler failed");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "install SIGTERM handler failed"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
