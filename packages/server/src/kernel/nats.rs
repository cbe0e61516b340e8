//! NATS queue abstraction for production and testing.
//!
//! Provides a trait-based wrapper over a JetStream subject/stream/consumer
//! model that allows swapping between a real NATS connection and a test
//! double. One durable consumer is created per subject; the stream retains
//! messages for seven days and redelivers anything left unacked for ten
//! minutes.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

/// Stream retention for update subjects.
const MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Redelivery window for unacked messages.
const ACK_WAIT: Duration = Duration::from_secs(10 * 60);

/// Naming and retention for one durable subscription.
#[derive(Debug, Clone)]
pub struct SubjectSpec {
    pub subject: String,
    pub max_age: Duration,
    pub ack_wait: Duration,
}

impl SubjectSpec {
    /// The standard durable subscription used by every pipeline task.
    pub fn durable(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            max_age: MAX_AGE,
            ack_wait: ACK_WAIT,
        }
    }

    /// Stream and durable-consumer name: the subject with `.` -> `-`.
    pub fn stream_name(&self) -> String {
        self.subject.replace('.', "-")
    }
}

/// One delivered message; the handler must ack it.
#[async_trait]
pub trait QueueMessage: Send + Sync {
    fn payload(&self) -> &[u8];
    async fn ack(&self) -> Result<()>;
}

pub type MessageStream = Pin<Box<dyn Stream<Item = Box<dyn QueueMessage>> + Send>>;

/// Trait for queue operations.
///
/// This allows swapping between real NATS and test doubles.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Publish a message to a subject. Returns on enqueue, not on processing.
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()>;

    /// Idempotently create the stream and durable consumer for `spec`, then
    /// start delivering its messages.
    async fn subscribe(&self, spec: &SubjectSpec) -> Result<MessageStream>;
}

// =============================================================================
// JetStream implementation
// =============================================================================

/// Real NATS-backed queue.
pub struct JetStreamQueue {
    client: async_nats::Client,
}

impl JetStreamQueue {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Queue for JetStreamQueue {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.client.publish(subject, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, spec: &SubjectSpec) -> Result<MessageStream> {
        let js = async_nats::jetstream::new(self.client.clone());
        let name = spec.stream_name();

        let stream = js
            .get_or_create_stream(async_nats::jetstream::stream::Config {
                name: name.clone(),
                subjects: vec![spec.subject.clone()],
                max_age: spec.max_age,
                ..Default::default()
            })
            .await
            .map_err(|err| anyhow::anyhow!("create / update stream failed: {err}"))?;

        let consumer = stream
            .get_or_create_consumer(
                &name,
                async_nats::jetstream::consumer::pull::Config {
                    durable_name: Some(name.clone()),
                    ack_policy: async_nats::jetstream::consumer::AckPolicy::Explicit,
                    ack_wait: spec.ack_wait,
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| anyhow::anyhow!("create / update consumer failed: {err}"))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|err| anyhow::anyhow!("consume failed: {err}"))?;

        Ok(Box::pin(messages.filter_map(|msg| async move {
            match msg {
                Ok(msg) => Some(Box::new(JetStreamMessage(msg)) as Box<dyn QueueMessage>),
                Err(err) => {
                    tracing::error!(error = %err, "receive message failed");
                    None
                }
            }
        })))
    }
}

struct JetStreamMessage(async_nats::jetstream::Message);

#[async_trait]
impl QueueMessage for JetStreamMessage {
    fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    async fn ack(&self) -> Result<()> {
        self.0
            .ack()
            .await
            .map_err(|err| anyhow::anyhow!("ack failed: {err}"))
    }
}

// =============================================================================
// Test double
// =============================================================================

/// A published message.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// Handle on a delivered test message, counting acks.
#[derive(Clone, Default)]
pub struct AckHandle(Arc<AtomicUsize>);

impl AckHandle {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mock queue that records published messages and hands scripted messages to
/// subscribers, without requiring a real connection.
#[derive(Default)]
pub struct TestQueue {
    published: RwLock<Vec<PublishedMessage>>,
    subscriptions: RwLock<Vec<SubjectSpec>>,
    senders: RwLock<HashMap<String, mpsc::UnboundedSender<Box<dyn QueueMessage>>>>,
}

impl TestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all published messages.
    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Get published messages for a specific subject.
    pub fn messages_for_subject(&self, subject: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    /// Check if any message was published to a subject.
    pub fn was_published_to(&self, subject: &str) -> bool {
        !self.messages_for_subject(subject).is_empty()
    }

    /// Get the count of published messages.
    pub fn publish_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Get all subscribed specs.
    pub fn subscriptions(&self) -> Vec<SubjectSpec> {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Deliver a message to the subject's subscriber, as the broker would.
    ///
    /// Returns an ack handle; panics (test-only) when nothing subscribed.
    pub fn deliver(&self, subject: &str, payload: impl Into<Bytes>) -> AckHandle {
        let handle = AckHandle::default();
        let msg = TestMessage {
            payload: payload.into(),
            acks: handle.clone(),
        };

        let senders = self.senders.read().unwrap_or_else(|e| e.into_inner());
        senders
            .get(subject)
            .unwrap_or_else(|| panic!("no subscriber on {subject}"))
            .send(Box::new(msg))
            .expect("subscriber dropped");

        handle
    }
}

struct TestMessage {
    payload: Bytes,
    acks: AckHandle,
}

#[async_trait]
impl QueueMessage for TestMessage {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(&self) -> Result<()> {
        self.acks.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Queue for TestQueue {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage { subject, payload });
        Ok(())
    }

    async fn subscribe(&self, spec: &SubjectSpec) -> Result<MessageStream> {
        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(spec.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(spec.subject.clone(), tx);

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_name_replaces_dots() {
        let spec = SubjectSpec::durable("web_history.websites.update.example_com");
        assert_eq!(spec.stream_name(), "web_history-websites-update-example_com");
    }

    #[test]
    fn test_durable_spec_retention() {
        let spec = SubjectSpec::durable("web_history.websites.batch_update");
        assert_eq!(spec.max_age, Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(spec.ack_wait, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_record_and_retrieve_messages() {
        let queue = TestQueue::new();

        queue
            .publish("a.b".to_string(), Bytes::from_static(b"{}"))
            .await
            .unwrap();

        assert_eq!(queue.publish_count(), 1);
        assert!(queue.was_published_to("a.b"));
        assert!(!queue.was_published_to("a.c"));
    }

    #[tokio::test]
    async fn test_deliver_reaches_subscriber_and_counts_acks() {
        let queue = TestQueue::new();
        let mut stream = queue
            .subscribe(&SubjectSpec::durable("a.b"))
            .await
            .unwrap();

        let handle = queue.deliver("a.b", Bytes::from_static(b"payload"));
        let msg = stream.next().await.unwrap();
        assert_eq!(msg.payload(), b"payload");
        assert_eq!(handle.count(), 0);

        msg.ack().await.unwrap();
        assert_eq!(handle.count(), 1);
    }
}
