//! Batch dispatcher: enumeration, fan-out, failure policy.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use common::{context_with_vendors, wait_until};
use server_core::kernel::Queue;
use server_core::tasks::WebsiteBatchUpdateTask;
use vendors::testing::ScriptedVendor;
use vendors::traits::store::WebsiteStore;
use vendors::types::website::{Website, WebsiteStatus};

const BATCH_SUBJECT: &str = "web_history.websites.batch_update";

fn seeded_website() -> Website {
    Website {
        uuid: "some uuid".to_string(),
        url: "https://example.com".to_string(),
        title: "title".to_string(),
        raw_content: "raw content".to_string(),
        update_time: Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap(),
        status: WebsiteStatus::Active,
    }
}

fn batch_task(ctx: &common::TestContext) -> Arc<WebsiteBatchUpdateTask> {
    Arc::new(WebsiteBatchUpdateTask::new(
        ctx.queue.clone() as Arc<dyn Queue>,
        ctx.update_tasks.clone(),
        ctx.store.clone() as Arc<dyn WebsiteStore>,
    ))
}

#[tokio::test(start_paused = true)]
async fn test_batch_trigger_publishes_one_message_per_supporting_vendor() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", true));
    let ctx = context_with_vendors(vec![vendor]);
    ctx.store.seed_website(seeded_website());

    let task = batch_task(&ctx);
    let _consumer = task.clone().subscribe().await.unwrap();

    let handle = ctx.queue.deliver(BATCH_SUBJECT, "trigger");
    wait_until(|| handle.count() == 1).await;

    let messages =
        ctx.queue.messages_for_subject("web_history.websites.update.handler_happy_flow");
    assert_eq!(messages.len(), 1);
    assert_eq!(
        std::str::from_utf8(&messages[0].payload).unwrap(),
        r#"{"website":{"uuid":"some uuid","url":"https://example.com","title":"title","raw_content":"raw content","update_time":"0001-01-01T00:00:00Z"},"trace_id":"00000000000000000000000000000000","span_id":"0000000000000000","trace_flags":0}"#
    );
}

#[tokio::test(start_paused = true)]
async fn test_website_supported_by_two_vendors_gets_two_messages() {
    let first = Arc::new(ScriptedVendor::new("first.example", true));
    let second = Arc::new(ScriptedVendor::new("second.example", true));
    let ctx = context_with_vendors(vec![first, second]);
    ctx.store.seed_website(seeded_website());

    let task = batch_task(&ctx);
    let _consumer = task.clone().subscribe().await.unwrap();

    let handle = ctx.queue.deliver(BATCH_SUBJECT, "trigger");
    wait_until(|| handle.count() == 1).await;

    assert!(ctx.queue.was_published_to("web_history.websites.update.first_example"));
    assert!(ctx.queue.was_published_to("web_history.websites.update.second_example"));
    assert_eq!(ctx.queue.publish_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_website_is_skipped_without_publish() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", false));
    let ctx = context_with_vendors(vec![vendor]);
    ctx.store.seed_website(seeded_website());

    let task = batch_task(&ctx);
    let _consumer = task.clone().subscribe().await.unwrap();

    let handle = ctx.queue.deliver(BATCH_SUBJECT, "trigger");
    wait_until(|| handle.count() == 1).await;

    assert_eq!(ctx.queue.publish_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_non_active_websites_are_not_dispatched() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", true));
    let ctx = context_with_vendors(vec![vendor]);

    let mut read_only = seeded_website();
    read_only.uuid = "read only".to_string();
    read_only.url = "https://read-only.example.com".to_string();
    read_only.status = WebsiteStatus::ReadOnly;
    ctx.store.seed_website(read_only);

    let mut inactive = seeded_website();
    inactive.uuid = "inactive".to_string();
    inactive.url = "https://inactive.example.com".to_string();
    inactive.status = WebsiteStatus::Inactive;
    ctx.store.seed_website(inactive);

    let task = batch_task(&ctx);
    let _consumer = task.clone().subscribe().await.unwrap();

    let handle = ctx.queue.deliver(BATCH_SUBJECT, "trigger");
    wait_until(|| handle.count() == 1).await;

    assert_eq!(ctx.queue.publish_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_enumeration_failure_skips_the_tick_and_acks() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", true));
    let ctx = context_with_vendors(vec![vendor]);
    ctx.store.seed_website(seeded_website());
    ctx.store.fail_finds();

    let task = batch_task(&ctx);
    let _consumer = task.clone().subscribe().await.unwrap();

    let handle = ctx.queue.deliver(BATCH_SUBJECT, "trigger");
    wait_until(|| handle.count() == 1).await;

    assert_eq!(ctx.queue.publish_count(), 0);
}
