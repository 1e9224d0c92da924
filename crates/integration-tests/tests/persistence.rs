//! Durability of enqueued callbacks across a restart

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fast_pool_config, sqlite_queue, task, wait_until_drained, TempDb};
use courier_core::application::{TaskProducer, WorkerPool};
use courier_core::port::callback_sender::mocks::ScriptedSender;
use courier_core::port::QueueInspector;

#[tokio::test]
async fn test_enqueued_tasks_survive_restart() {
    let db = TempDb::new();

    // First run: accept work, never deliver it
    {
        let queue = sqlite_queue(&db.url(), Duration::from_secs(30)).await;
        let producer = TaskProducer::new(queue.clone());
        for i in 0..5 {
            producer
                .send(&task(&format!("tenant-{}", i), "https://hooks.test/p"))
                .await
                .unwrap();
        }
        assert_eq!(queue.stats().await.unwrap().total, 5);
    }

    // Second run: the same file, a fresh pool
    let queue = sqlite_queue(&db.url(), Duration::from_secs(30)).await;
    assert_eq!(queue.stats().await.unwrap().visible, 5);

    let sender = Arc::new(ScriptedSender::new_success());
    let mut pool = WorkerPool::new(fast_pool_config(2), queue.clone(), sender.clone()).unwrap();
    pool.start().unwrap();
    wait_until_drained(&queue).await;
    pool.stop().await.unwrap();

    let mut tenants = sender.tenants();
    tenants.sort();
    assert_eq!(
        tenants,
        vec!["tenant-0", "tenant-1", "tenant-2", "tenant-3", "tenant-4"]
    );
}

#[tokio::test]
async fn test_migrations_are_idempotent_on_reopen() {
    let db = TempDb::new();
    sqlite_queue(&db.url(), Duration::from_secs(30)).await;
    let queue = sqlite_queue(&db.url(), Duration::from_secs(30)).await;
    assert_eq!(queue.stats().await.unwrap().total, 0);
}
