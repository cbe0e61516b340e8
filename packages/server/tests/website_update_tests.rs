//! Per-vendor update task: consumption, validation, ack policy.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use common::{context_with_vendors, wait_until};
use vendors::testing::ScriptedVendor;
use vendors::types::website::Website;

const SUBJECT: &str = "web_history.websites.update.handler_happy_flow";

const ENVELOPE: &str = r#"{"website":{"uuid":"some uuid","url":"https://example.com","title":"title","raw_content":"raw content","update_time":"0001-01-01T00:00:00Z"},"trace_id":"00000000000000000000000000000000","span_id":"0000000000000000","trace_flags":0}"#;

#[tokio::test]
async fn test_subject_is_derived_from_vendor_name() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", true));
    let ctx = context_with_vendors(vec![vendor]);

    let task = ctx.update_tasks.iter().next().unwrap();
    assert_eq!(task.subject(), SUBJECT);
}

#[tokio::test]
async fn test_subscribe_creates_durable_consumer_with_ack_wait() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", true));
    let ctx = context_with_vendors(vec![vendor]);

    let task = ctx.update_tasks.iter().next().unwrap().clone();
    let _consumer = task.clone().subscribe().await.unwrap();

    let specs = ctx.queue.subscriptions();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].subject, SUBJECT);
    assert_eq!(specs[0].stream_name(), "web_history-websites-update-handler_happy_flow");
    assert_eq!(specs[0].ack_wait, Duration::from_secs(600));
    assert_eq!(specs[0].max_age, Duration::from_secs(7 * 24 * 60 * 60));
}

#[tokio::test(start_paused = true)]
async fn test_handler_calls_vendor_with_decoded_snapshot_and_acks_once() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", true));
    let ctx = context_with_vendors(vec![vendor.clone()]);

    let task = ctx.update_tasks.iter().next().unwrap().clone();
    let _consumer = task.clone().subscribe().await.unwrap();

    let handle = ctx.queue.deliver(SUBJECT, ENVELOPE);
    wait_until(|| handle.count() == 1).await;

    let calls = vendor.update_calls();
    assert_eq!(calls.len(), 1);

    let web = &calls[0];
    assert_eq!(web.uuid, "some uuid");
    assert_eq!(web.url, "https://example.com");
    assert_eq!(web.title, "title");
    assert_eq!(web.raw_content, "raw content");
    assert_eq!(
        web.update_time,
        Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(handle.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wrongly_routed_message_is_acked_without_update() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", false));
    let ctx = context_with_vendors(vec![vendor.clone()]);

    let task = ctx.update_tasks.iter().next().unwrap().clone();
    let _consumer = task.clone().subscribe().await.unwrap();

    let handle = ctx.queue.deliver(SUBJECT, ENVELOPE);
    wait_until(|| handle.count() == 1).await;

    assert!(vendor.update_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_message_is_acked_and_discarded() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", true));
    let ctx = context_with_vendors(vec![vendor.clone()]);

    let task = ctx.update_tasks.iter().next().unwrap().clone();
    let _consumer = task.clone().subscribe().await.unwrap();

    let handle = ctx.queue.deliver(SUBJECT, "some unknown message");
    wait_until(|| handle.count() == 1).await;

    assert!(vendor.update_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_update_error_still_acks_exactly_once() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", true).fail_update());
    let ctx = context_with_vendors(vec![vendor.clone()]);

    let task = ctx.update_tasks.iter().next().unwrap().clone();
    let _consumer = task.clone().subscribe().await.unwrap();

    let handle = ctx.queue.deliver(SUBJECT, ENVELOPE);
    wait_until(|| handle.count() == 1).await;

    assert_eq!(vendor.update_calls().len(), 1);
    assert_eq!(handle.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_messages_on_one_subject_are_processed_in_order() {
    let vendor = Arc::new(ScriptedVendor::new("handler.happy_flow", true));
    let ctx = context_with_vendors(vec![vendor.clone()]);

    let task = ctx.update_tasks.iter().next().unwrap().clone();
    let _consumer = task.clone().subscribe().await.unwrap();

    let first = Website {
        uuid: "first".to_string(),
        ..Website::new("https://example.com/1")
    };
    let second = Website {
        uuid: "second".to_string(),
        ..Website::new("https://example.com/2")
    };

    task.publish(&first).await.unwrap();
    task.publish(&second).await.unwrap();

    let published = ctx.queue.messages_for_subject(SUBJECT);
    let h1 = ctx.queue.deliver(SUBJECT, published[0].payload.clone());
    let h2 = ctx.queue.deliver(SUBJECT, published[1].payload.clone());

    wait_until(|| h1.count() == 1 && h2.count() == 1).await;

    let calls = vendor.update_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].uuid, "first");
    assert_eq!(calls[1].uuid, "second");
}
