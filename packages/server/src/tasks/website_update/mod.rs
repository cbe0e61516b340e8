//! Per-vendor update task.
//!
//! Each task owns one durable subscription on one subject and one vendor
//! extractor. Messages are acked on every outcome; a lost update is caught
//! by the next batch tick, which is cheaper than poison-pill reprocessing.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use futures::{FutureExt, StreamExt};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use vendors::traits::{store::WebsiteStore, vendor::Vendor};
use vendors::types::website::Website;

use crate::kernel::nats::{Queue, QueueMessage, SubjectSpec};

pub mod params;

pub use params::WebsiteUpdateParams;

/// Cool-down between finishing one update and acking, so the next dequeue
/// does not immediately hammer the same vendor. Stacks with the extractor's
/// own fetch interval.
const POST_UPDATE_SLEEP: Duration = Duration::from_secs(1);

/// Errors from the publish side of the task set.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("website is not supported")]
    NotSupportedWebsite,

    #[error("serialize update params: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("publish update message: {0}")]
    Queue(anyhow::Error),
}

/// One vendor's consumer plus its publish entry point.
pub struct WebsiteUpdateTask {
    queue: Arc<dyn Queue>,
    pub vendor: Arc<dyn Vendor>,
    #[allow(dead_code)]
    store: Arc<dyn WebsiteStore>,
}

impl WebsiteUpdateTask {
    pub fn new(
        queue: Arc<dyn Queue>,
        vendor: Arc<dyn Vendor>,
        store: Arc<dyn WebsiteStore>,
    ) -> Self {
        Self { queue, vendor, store }
    }

    /// The task's subject: the vendor name with `.` replaced by `_`.
    pub fn subject(&self) -> String {
        format!(
            "web_history.websites.update.{}",
            self.vendor.name().replace('.', "_")
        )
    }

    /// Enqueue one update for one website. Returns on enqueue.
    pub async fn publish(&self, web: &Website) -> Result<(), PublishError> {
        let params = WebsiteUpdateParams::from_website(web);
        let data = params.to_data()?;

        self.queue
            .publish(self.subject(), Bytes::from(data))
            .await
            .map_err(PublishError::Queue)?;

        Ok(())
    }

    /// Create the durable subscription and start the consume loop.
    pub async fn subscribe(self: Arc<Self>) -> Result<JoinHandle<()>> {
        let spec = SubjectSpec::durable(self.subject());
        let mut messages = self.queue.subscribe(&spec).await?;

        Ok(tokio::spawn(async move {
            while let Some(msg) = messages.next().await {
                if AssertUnwindSafe(self.handle(msg.as_ref()))
                    .catch_unwind()
                    .await
                    .is_err()
                {
                    error!(vendor = self.vendor.name(), "website update handler panicked");
                }

                // Ack on every outcome; redelivery only covers a process
                // that died before reaching this point.
                if let Err(err) = msg.ack().await {
                    error!(error = %err, "ack failed");
                }
            }
        }))
    }

    async fn handle(&self, msg: &dyn QueueMessage) {
        let params = match WebsiteUpdateParams::from_data(msg.payload()) {
            Ok(params) => params,
            Err(err) => {
                error!(
                    error = %err,
                    data = %String::from_utf8_lossy(msg.payload()),
                    vendor = self.vendor.name(),
                    "failed to parse message body"
                );
                return;
            }
        };

        let span = info_span!(
            "website_update",
            task = "website-update",
            vendor = self.vendor.name(),
            trace_id = %params.trace_id,
            website_uuid = %params.website.uuid,
            website_url = %params.website.url,
            website_title = %params.website.title,
        );
        if let Some(remote) = params.remote_context() {
            span.set_parent(remote);
        }

        async {
            let mut web = params.website();

            if !self.vendor.support(&web) {
                error!(
                    error = %PublishError::NotSupportedWebsite,
                    "validate params failed"
                );
                return;
            }

            if let Err(err) = self.vendor.update(&mut web).await {
                error!(error = %err, "update website failed");
            }

            tokio::time::sleep(POST_UPDATE_SLEEP).await;
        }
        .instrument(span)
        .await
    }
}

/// The full set of per-vendor tasks, one per configured vendor.
pub struct WebsiteUpdateTasks(Vec<Arc<WebsiteUpdateTask>>);

impl WebsiteUpdateTasks {
    pub fn new(
        queue: Arc<dyn Queue>,
        services: Vec<Arc<dyn Vendor>>,
        store: Arc<dyn WebsiteStore>,
    ) -> Self {
        Self(
            services
                .into_iter()
                .map(|vendor| {
                    Arc::new(WebsiteUpdateTask::new(queue.clone(), vendor, store.clone()))
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<WebsiteUpdateTask>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Enqueue one update per supporting vendor.
    ///
    /// Returns the supporting vendor names; when none match, returns
    /// [`PublishError::NotSupportedWebsite`] without touching the queue.
    pub async fn publish(&self, web: &Website) -> Result<Vec<String>, PublishError> {
        let mut supported = Vec::with_capacity(self.0.len());

        for task in &self.0 {
            if task.vendor.support(web) {
                supported.push(task.vendor.name().to_string());
                task.publish(web).await?;
            }
        }

        if supported.is_empty() {
            return Err(PublishError::NotSupportedWebsite);
        }

        Ok(supported)
    }

    /// Subscribe every task; returns one consumer handle per vendor.
    pub async fn subscribe_all(&self) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::with_capacity(self.0.len());
        for task in &self.0 {
            handles.push(task.clone().subscribe().await?);
        }
        Ok(handles)
    }
}
