// Main entry point for the update worker

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use server_core::domains::websites::PgWebsiteStore;
use server_core::kernel::scheduler::start_batch_trigger;
use server_core::kernel::{telemetry, JetStreamQueue, Queue};
use server_core::server::shutdown_signal;
use server_core::tasks::{WebsiteBatchUpdateTask, WebsiteUpdateTasks};
use server_core::Config;
use vendors::traits::store::WebsiteStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let tracer_provider = telemetry::init(config.trace_url.as_deref(), &config.trace_service_name)
        .context("Failed to initialize telemetry")?;

    tracing::info!("Starting web-watch update worker");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(5)
        .idle_timeout(Duration::from_secs(5))
        .max_lifetime(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let nats = async_nats::connect(&config.nats_url)
        .await
        .context("Failed to connect to NATS")?;
    let queue: Arc<dyn Queue> = Arc::new(JetStreamQueue::new(nats));

    let store: Arc<dyn WebsiteStore> = Arc::new(PgWebsiteStore::new(pool.clone()));
    let client = reqwest::Client::builder()
        .timeout(config.client_timeout)
        .build()
        .context("Failed to create HTTP client")?;
    let website_conf = Arc::new(config.website.clone());
    let vendor_configs = config.load_vendor_configs()?;
    let services = vendors::sites::new_service_set(&client, &store, &website_conf, &vendor_configs)
        .context("Failed to create vendor services")?;

    let update_tasks = Arc::new(WebsiteUpdateTasks::new(
        queue.clone(),
        services,
        store.clone(),
    ));

    // One durable consumer per vendor, plus the batch dispatcher.
    let mut consumers = update_tasks
        .subscribe_all()
        .await
        .context("Failed to subscribe update tasks")?;
    tracing::info!(consumer_count = consumers.len(), "Update consumers started");

    let batch_task = Arc::new(WebsiteBatchUpdateTask::new(
        queue.clone(),
        update_tasks.clone(),
        store.clone(),
    ));
    consumers.push(
        batch_task
            .clone()
            .subscribe()
            .await
            .context("Failed to subscribe batch update task")?,
    );

    // The in-process trigger is optional; deployments with an external
    // scheduler leave BATCH_UPDATE_CRON unset.
    let mut scheduler = match &config.batch_update_cron {
        Some(cron) => Some(
            start_batch_trigger(queue.clone(), cron)
                .await
                .context("Failed to start batch trigger")?,
        ),
        None => None,
    };

    shutdown_signal().await;
    tracing::info!("Shutting down update worker");

    // Stop producing, then consuming, then close the DB and flush traces.
    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(err) = scheduler.shutdown().await {
            tracing::error!(error = %err, "scheduler shutdown failed");
        }
    }
    for consumer in consumers {
        consumer.abort();
    }
    pool.close().await;
    if let Some(provider) = tracer_provider {
        provider
            .shutdown()
            .map_err(|err| anyhow::anyhow!("tracer shutdown failed: {err}"))?;
    }

    Ok(())
}
