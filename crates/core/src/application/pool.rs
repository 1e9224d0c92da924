// Worker Pool - Lifecycle for a fixed set of delivery workers

use crate::application::producer::TaskProducer;
use crate::application::worker::constants::DEFAULT_WORKER_COUNT;
use crate::application::worker::{
    describe_join_error, shutdown_channel, ShutdownSender, Worker, WorkerConfig, WorkerState,
};
use crate::domain::{MessageId, Task};
use crate::error::{AppError, Result};
use crate::port::{CallbackSender, DurableQueue};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pool configuration
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Number of workers spawned by `start` (must be > 0)
    pub workers: usize,
    pub worker: WorkerConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            worker: WorkerConfig::default(),
        }
    }
}

/// Read-only snapshot source for worker states
///
/// Taken from a started pool; keeps reporting the last known state of each
/// worker after the pool stops.
#[derive(Debug, Clone, Default)]
pub struct PoolMonitor {
    states: Vec<watch::Receiver<WorkerState>>,
}

impl PoolMonitor {
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.states.iter().map(|rx| *rx.borrow()).collect()
    }

    pub fn worker_count(&self) -> usize {
        self.states.len()
    }
}

struct RunningWorkers {
    shutdown: ShutdownSender,
    handles: Vec<JoinHandle<()>>,
}

/// Worker Pool
///
/// Exclusively owns its workers, the shared queue handle and the shared
/// sender. Workers share nothing mutable with each other; mutual exclusion
/// over messages is left to the queue.
pub struct WorkerPool {
    config: PoolConfig,
    queue: Arc<dyn DurableQueue>,
    sender: Arc<dyn CallbackSender>,
    producer: TaskProducer,
    states: Vec<watch::Receiver<WorkerState>>,
    running: Option<RunningWorkers>,
}

impl WorkerPool {
    pub fn new(
        config: PoolConfig,
        queue: Arc<dyn DurableQueue>,
        sender: Arc<dyn CallbackSender>,
    ) -> Result<Self> {
        if config.workers == 0 {
            return Err(AppError::Config(
                "worker pool needs at least one worker".to_string(),
            ));
        }

        Ok(Self {
            config,
            producer: TaskProducer::new(Arc::clone(&queue)),
            queue,
            sender,
            states: Vec::new(),
            running: None,
        })
    }

    /// Spawn `config.workers` workers, each on its own tokio task
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(AppError::InvalidState(
                "worker pool is already running".to_string(),
            ));
        }

        info!(workers = self.config.workers, "Starting worker pool");

        let (shutdown, token) = shutdown_channel();
        let mut handles = Vec::with_capacity(self.config.workers);
        let mut states = Vec::with_capacity(self.config.workers);

        for worker_id in 0..self.config.workers {
            let worker = Worker::new(
                worker_id,
                Arc::clone(&self.queue),
                Arc::clone(&self.sender),
                self.config.worker,
            );
            states.push(worker.subscribe());
            handles.push(tokio::spawn(worker.run(token.clone())));
        }

        self.states = states;
        self.running = Some(RunningWorkers { shutdown, handles });
        Ok(())
    }

    /// Signal every worker and wait until all of them have exited
    ///
    /// In-flight deliveries finish first. Calling this on a pool that is not
    /// running does nothing.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            debug!("Worker pool is not running, nothing to stop");
            return Ok(());
        };

        info!(
            workers = running.handles.len(),
            "Stopping worker pool, waiting for in-flight deliveries"
        );
        running.shutdown.shutdown();

        let mut failed = 0;
        for (worker_id, handle) in running.handles.into_iter().enumerate() {
            if let Err(join_err) = handle.await {
                failed += 1;
                error!(
                    worker_id,
                    error = %describe_join_error(join_err),
                    "Worker terminated abnormally"
                );
            }
        }

        if failed > 0 {
            return Err(AppError::Internal(format!(
                "{} worker(s) terminated abnormally",
                failed
            )));
        }

        info!("Worker pool stopped");
        Ok(())
    }

    /// Enqueue a task for eventual delivery
    pub async fn send(&self, task: &Task) -> Result<MessageId> {
        self.producer.send(task).await
    }

    /// Cloneable producer sharing this pool's queue
    pub fn producer(&self) -> TaskProducer {
        self.producer.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Current state of each worker, indexed by worker id
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.states.iter().map(|rx| *rx.borrow()).collect()
    }

    pub fn monitor(&self) -> PoolMonitor {
        PoolMonitor {
            states: self.states.clone(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            warn!("Worker pool dropped while running; signalling workers without waiting");
            running.shutdown.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CallbackPayload, TenantId};
    use crate::port::callback_sender::mocks::ScriptedSender;
    use crate::port::queue::mocks::{InMemoryQueue, QueueCall};
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn fast_config(workers: usize) -> PoolConfig {
        PoolConfig {
            workers,
            worker: WorkerConfig {
                retry_delay: Duration::from_millis(30),
                poll_interval: Duration::from_millis(5),
                error_backoff: Duration::from_millis(5),
            },
        }
    }

    fn task(tenant: &str) -> Task {
        Task::new(
            TenantId::new(tenant).unwrap(),
            CallbackPayload::new("app.updated", "http://hooks.test/cb", json!({"t": tenant})),
        )
        .unwrap()
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let sender = Arc::new(ScriptedSender::new_success());
        let result = WorkerPool::new(fast_config(0), queue, sender);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_start_twice_is_invalid_state() {
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let sender = Arc::new(ScriptedSender::new_success());
        let mut pool = WorkerPool::new(fast_config(2), queue, sender).unwrap();

        pool.start().unwrap();
        assert!(matches!(pool.start(), Err(AppError::InvalidState(_))));
        pool.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_joins_every_worker() {
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let sender = Arc::new(ScriptedSender::new_success());
        let mut pool = WorkerPool::new(fast_config(3), queue, sender).unwrap();

        pool.start().unwrap();
        assert_eq!(pool.worker_states().len(), 3);
        assert!(pool.is_running());

        pool.stop().await.unwrap();
        assert!(!pool.is_running());
        assert!(pool
            .worker_states()
            .iter()
            .all(|s| *s == WorkerState::Stopped));

        // Second stop is a no-op
        assert_ok!(pool.stop().await);
    }

    #[tokio::test]
    async fn test_monitor_outlives_running_state() {
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let sender = Arc::new(ScriptedSender::new_success());
        let mut pool = WorkerPool::new(fast_config(2), queue, sender).unwrap();
        assert_eq!(pool.monitor().worker_count(), 0);

        pool.start().unwrap();
        let monitor = pool.monitor();
        assert_eq!(monitor.worker_count(), 2);

        pool.stop().await.unwrap();
        assert_eq!(
            monitor.worker_states(),
            vec![WorkerState::Stopped, WorkerState::Stopped]
        );
    }

    #[tokio::test]
    async fn test_three_tenants_each_delivered_once() {
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let sender = Arc::new(ScriptedSender::new_success());
        let mut pool = WorkerPool::new(fast_config(2), queue.clone(), sender.clone()).unwrap();

        for tenant in ["A", "B", "C"] {
            pool.send(&task(tenant)).await.unwrap();
        }
        pool.start().unwrap();
        wait_until(|| queue.deletes().len() == 3).await;
        pool.stop().await.unwrap();

        let mut tenants = sender.tenants();
        tenants.sort();
        assert_eq!(tenants, vec!["A", "B", "C"]);
        assert_eq!(queue.deletes().len(), 3);
        assert!(queue.extends().is_empty());
    }

    #[tokio::test]
    async fn test_fail_twice_then_succeed() {
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let sender = Arc::new(ScriptedSender::fail_then_succeed(2));
        let mut pool = WorkerPool::new(fast_config(2), queue.clone(), sender.clone()).unwrap();

        let id = pool.send(&task("A")).await.unwrap();
        pool.start().unwrap();
        wait_until(|| queue.delete_count(&id) == 1).await;
        pool.stop().await.unwrap();

        let calls: Vec<_> = queue
            .calls()
            .into_iter()
            .filter(|c| matches!(c, QueueCall::Delete(_) | QueueCall::Extend(_, _)))
            .collect();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], QueueCall::Extend(_, _)));
        assert!(matches!(calls[1], QueueCall::Extend(_, _)));
        assert!(matches!(calls[2], QueueCall::Delete(_)));
        assert_eq!(sender.call_count(), 3);
    }

    #[tokio::test]
    async fn test_always_failing_sender_extends_and_never_deletes() {
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let sender = Arc::new(ScriptedSender::new_fail("connection refused"));
        let mut config = fast_config(2);
        config.worker.retry_delay = Duration::from_millis(20);
        let mut pool = WorkerPool::new(config, queue.clone(), sender.clone()).unwrap();

        let id = pool.send(&task("A")).await.unwrap();
        pool.start().unwrap();
        wait_until(|| queue.extend_count(&id) >= 3).await;
        pool.stop().await.unwrap();

        assert!(sender.call_count() >= 3);
        assert_eq!(queue.delete_count(&id), 0);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_producer_is_usable_while_running() {
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let sender = Arc::new(ScriptedSender::new_success());
        let mut pool = WorkerPool::new(fast_config(1), queue.clone(), sender.clone()).unwrap();
        pool.start().unwrap();

        let producer = pool.producer();
        producer.send(&task("late")).await.unwrap();
        wait_until(|| queue.deletes().len() == 1).await;
        pool.stop().await.unwrap();

        assert_eq!(sender.tenants(), vec!["late"]);
    }

    #[tokio::test]
    async fn test_many_tasks_few_workers_each_delivered_once() {
        const TASKS: usize = 200;
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let sender = Arc::new(ScriptedSender::new_success());
        let mut pool = WorkerPool::new(fast_config(4), queue.clone(), sender.clone()).unwrap();

        for i in 0..TASKS {
            pool.send(&task(&format!("tenant-{}", i))).await.unwrap();
        }
        pool.start().unwrap();
        wait_until(|| queue.deletes().len() == TASKS).await;
        pool.stop().await.unwrap();

        assert_eq!(sender.call_count(), TASKS);
        assert_eq!(queue.deletes().len(), TASKS);
        let unique: HashSet<_> = sender.tenants().into_iter().collect();
        assert_eq!(unique.len(), TASKS);
        assert!(queue.is_empty());
    }
}
