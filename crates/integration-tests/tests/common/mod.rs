//! Shared setup for the integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use courier_core::application::{PoolConfig, WorkerConfig};
use courier_core::domain::{CallbackPayload, Task, TenantId};
use courier_core::port::id_provider::UuidProvider;
use courier_core::port::time_provider::SystemTimeProvider;
use courier_core::port::QueueInspector;
use courier_infra_sqlite::{create_pool, run_migrations, SqliteQueue};

pub async fn sqlite_queue(url: &str, visibility_timeout: Duration) -> Arc<SqliteQueue> {
    let pool = create_pool(url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqliteQueue::new(
        pool,
        Arc::new(SystemTimeProvider),
        Arc::new(UuidProvider),
        visibility_timeout,
    ))
}

pub async fn memory_queue() -> Arc<SqliteQueue> {
    sqlite_queue("sqlite::memory:", Duration::from_secs(30)).await
}

pub fn fast_pool_config(workers: usize) -> PoolConfig {
    PoolConfig {
        workers,
        worker: WorkerConfig {
            retry_delay: Duration::from_millis(50),
            poll_interval: Duration::from_millis(10),
            error_backoff: Duration::from_millis(10),
        },
    }
}

pub fn task(tenant: &str, url: &str) -> Task {
    Task::new(
        TenantId::new(tenant).unwrap(),
        CallbackPayload::new(
            "subscription.renewed",
            url,
            serde_json::json!({"tenant": tenant}),
        ),
    )
    .unwrap()
}

/// Poll until every stored message has been deleted
pub async fn wait_until_drained(queue: &SqliteQueue) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while queue.stats().await.unwrap().total > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("queue was not drained in time");
}

/// Database file removed (with its WAL siblings) on drop
pub struct TempDb {
    pub path: PathBuf,
}

impl TempDb {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("courier-it-{}.db", uuid::Uuid::new_v4()));
        Self { path }
    }

    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}
