//! Batch dispatcher task.
//!
//! One durable consumer on the batch subject. Each trigger enumerates every
//! active website and routes it to all supporting vendors' subjects. The
//! trigger payload is opaque; its hash becomes the task id in the logs.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use futures::{FutureExt, StreamExt};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::{error, info_span, warn, Instrument};

use vendors::traits::store::WebsiteStore;
use vendors::types::website::Website;

use crate::kernel::nats::{Queue, QueueMessage, SubjectSpec};
use crate::tasks::website_update::{PublishError, WebsiteUpdateTasks};

pub const BATCH_UPDATE_SUBJECT: &str = "web_history.websites.batch_update";

pub struct WebsiteBatchUpdateTask {
    queue: Arc<dyn Queue>,
    update_tasks: Arc<WebsiteUpdateTasks>,
    store: Arc<dyn WebsiteStore>,
}

impl WebsiteBatchUpdateTask {
    pub fn new(
        queue: Arc<dyn Queue>,
        update_tasks: Arc<WebsiteUpdateTasks>,
        store: Arc<dyn WebsiteStore>,
    ) -> Self {
        Self {
            queue,
            update_tasks,
            store,
        }
    }

    pub fn subject(&self) -> &'static str {
        BATCH_UPDATE_SUBJECT
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
                    error!("website batch update handler panicked");
                }

                if let Err(err) = msg.ack().await {
                    error!(error = %err, "ack message failed");
                }
            }
        }))
    }

    async fn handle(&self, msg: &dyn QueueMessage) {
        let span = info_span!(
            "website_batch_update",
            task = "website-batch-update",
            task_id = %hash_data(msg.payload()),
        );

        async {
            let websites = match self.store.find_websites().await {
                Ok(websites) => websites,
                Err(err) => {
                    // Skip the whole tick; the next trigger retries.
                    error!(error = %err, "load website from db failed");
                    return;
                }
            };

            for web in &websites {
                self.publish_website_update(web).await;
            }
        }
        .instrument(span)
        .await
    }

    async fn publish_website_update(&self, web: &Website) {
        let span = info_span!(
            "publish_update_website",
            host = %web.host(),
            website_uuid = %web.uuid,
            website_url = %web.url,
            website_title = %web.title,
            support_tasks = tracing::field::Empty,
        );

        async {
            match self.update_tasks.publish(web).await {
                Ok(supported) => {
                    tracing::Span::current()
                        .record("support_tasks", supported.join(",").as_str());
                    if supported.len() > 1 {
                        warn!(
                            support_task_names = %supported.join(","),
                            "multiple support task for website"
                        );
                    }
                }
                Err(PublishError::NotSupportedWebsite) => {
                    warn!("no support task for website");
                }
                Err(err) => {
                    error!(error = %err, "publish website update task failed");
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn hash_data(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_data_is_hex_sha256() {
        assert_eq!(
            hash_data(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(hash_data(b"trigger").len(), 64);
    }
}
