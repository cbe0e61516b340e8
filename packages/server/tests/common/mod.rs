// Common test utilities
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use server_core::kernel::{Queue, TestQueue};
use server_core::server::{build_app, AppState};
use server_core::tasks::website_update::WebsiteUpdateTasks;
use vendors::testing::MemoryStore;
use vendors::traits::{store::WebsiteStore, vendor::Vendor};

pub const USER_UUID: &str = "7b9bd9f0-2cb7-4bf9-845a-ae6b7c63a363";

/// The pipeline wired onto in-memory collaborators.
pub struct TestContext {
    pub queue: Arc<TestQueue>,
    pub store: Arc<MemoryStore>,
    pub update_tasks: Arc<WebsiteUpdateTasks>,
}

pub fn context_with_vendors(services: Vec<Arc<dyn Vendor>>) -> TestContext {
    let queue = Arc::new(TestQueue::new());
    let store = Arc::new(MemoryStore::new());
    let update_tasks = Arc::new(WebsiteUpdateTasks::new(
        queue.clone() as Arc<dyn Queue>,
        services,
        store.clone() as Arc<dyn WebsiteStore>,
    ));

    TestContext {
        queue,
        store,
        update_tasks,
    }
}

impl TestContext {
    pub fn app(&self) -> Router {
        build_app(
            AppState {
                store: self.store.clone() as Arc<dyn WebsiteStore>,
                update_tasks: self.update_tasks.clone(),
                pool: None,
            },
            "/api/web-watcher",
        )
    }
}

/// Poll until `cond` holds; fails the test when it never does.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached in time");
}
