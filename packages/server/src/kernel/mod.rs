//! Process-level plumbing shared by the API and the worker.

pub mod nats;
pub mod scheduler;
pub mod telemetry;

pub use nats::{JetStreamQueue, MessageStream, PublishedMessage, Queue, QueueMessage, SubjectSpec, TestQueue};
