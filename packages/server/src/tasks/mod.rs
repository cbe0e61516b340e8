//! Queue-driven pipeline tasks.
//!
//! One durable consumer per vendor ([`website_update`]) plus the batch
//! dispatcher ([`website_batch_update`]) that fans a single trigger out into
//! one update message per (website, supporting vendor).

pub mod website_batch_update;
pub mod website_update;

pub use website_batch_update::WebsiteBatchUpdateTask;
pub use website_update::{PublishError, WebsiteUpdateTask, WebsiteUpdateTasks};
