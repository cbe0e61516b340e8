//! Scheduled batch trigger using tokio-cron-scheduler.
//!
//! The batch dispatcher only consumes; something must publish the trigger.
//! Deployments with an external scheduler skip this module entirely, those
//! without set `BATCH_UPDATE_CRON` and the worker publishes for itself.

use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::kernel::nats::Queue;
use crate::tasks::website_batch_update::BATCH_UPDATE_SUBJECT;

/// Start a scheduler that publishes one batch trigger per cron firing.
pub async fn start_batch_trigger(queue: Arc<dyn Queue>, cron: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let queue = queue.clone();
        Box::pin(async move {
            // The payload is opaque to the dispatcher; a timestamp keeps
            // every trigger's task id distinct in the logs.
            let payload = format!("batch update triggered at {}", Utc::now().to_rfc3339());
            if let Err(err) = queue
                .publish(BATCH_UPDATE_SUBJECT.to_string(), Bytes::from(payload))
                .await
            {
                tracing::error!(error = %err, "publish batch update trigger failed");
            } else {
                tracing::info!("published batch update trigger");
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(cron = cron, "batch update trigger scheduled");
    Ok(scheduler)
}
