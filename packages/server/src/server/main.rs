// Main entry point for the API server

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use server_core::domains::websites::PgWebsiteStore;
use server_core::kernel::{telemetry, JetStreamQueue, Queue};
use server_core::server::{build_app, shutdown_signal, AppState};
use server_core::tasks::website_update::WebsiteUpdateTasks;
use server_core::Config;
use vendors::traits::store::WebsiteStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize logging and tracing
    let tracer_provider = telemetry::init(config.trace_url.as_deref(), &config.trace_service_name)
        .context("Failed to initialize telemetry")?;

    tracing::info!("Starting web-watch API server");

    // Connect to database
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(5)
        .idle_timeout(Duration::from_secs(5))
        .max_lifetime(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Connect to NATS
    let nats = async_nats::connect(&config.nats_url)
        .await
        .context("Failed to connect to NATS")?;
    let queue: Arc<dyn Queue> = Arc::new(JetStreamQueue::new(nats));

    // Build the vendor extractor set
    let store: Arc<dyn WebsiteStore> = Arc::new(PgWebsiteStore::new(pool.clone()));
    let client = reqwest::Client::builder()
        .timeout(config.client_timeout)
        .build()
        .context("Failed to create HTTP client")?;
    let website_conf = Arc::new(config.website.clone());
    let vendor_configs = config.load_vendor_configs()?;
    let services = vendors::sites::new_service_set(&client, &store, &website_conf, &vendor_configs)
        .context("Failed to create vendor services")?;
    tracing::info!(vendor_count = services.len(), "Vendor services created");

    let update_tasks = Arc::new(WebsiteUpdateTasks::new(
        queue.clone(),
        services,
        store.clone(),
    ));

    // Build application
    let app = build_app(
        AppState {
            store,
            update_tasks,
            pool: Some(pool.clone()),
        },
        &config.api_route_prefix,
    );

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Shut down in dependency order: server drained already, then DB, then
    // the tracer so the final spans flush.
    pool.close().await;
    if let Some(provider) = tracer_provider {
        provider
            .shutdown()
            .map_err(|err| anyhow::anyhow!("tracer shutdown failed: {err}"))?;
    }

    Ok(())
}
