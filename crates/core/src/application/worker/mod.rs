// Worker - Callback delivery loop

pub mod constants;
mod panic_guard;
mod shutdown;

use constants::*;
pub use panic_guard::describe_join_error;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::domain::{MessageId, QueueMessage, Task};
use crate::error::Result;
use crate::port::{CallbackSender, DurableQueue, SendError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Worker State
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    Idle,
    Processing,
    Stopped,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "IDLE"),
            WorkerState::Processing => write!(f, "PROCESSING"),
            WorkerState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// What a single receive/deliver cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing visible in the queue
    Empty,
    /// Callback delivered, message deleted
    Delivered,
    /// Delivery failed, visibility extended
    Retried,
    /// Poison message deleted without delivery
    Discarded,
}

/// Per-worker timing knobs
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Visibility extension after a failed delivery
    pub retry_delay: Duration,
    /// Sleep between polls of an empty queue
    pub poll_interval: Duration,
    /// Sleep after a failed receive
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            poll_interval: IDLE_SLEEP_DURATION,
            error_backoff: ERROR_RECOVERY_SLEEP_DURATION,
        }
    }
}

/// Worker pulls one message at a time and attempts delivery
pub struct Worker {
    id: usize,
    queue: Arc<dyn DurableQueue>,
    sender: Arc<dyn CallbackSender>,
    config: WorkerConfig,
    state: watch::Sender<WorkerState>,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: Arc<dyn DurableQueue>,
        sender: Arc<dyn CallbackSender>,
        config: WorkerConfig,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            id,
            queue,
            sender,
            config,
            state,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Observe this worker's state from elsewhere (e.g. the pool)
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Run worker loop until shutdown is requested
    ///
    /// The stop signal is only honoured between cycles: a delivery that has
    /// started always runs to completion first.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(worker_id = self.id, "Worker started");
        loop {
            if shutdown.is_shutdown() {
                info!(worker_id = self.id, "Worker shutting down");
                break;
            }
            match self.process_next().await {
                Ok(CycleOutcome::Empty) => {
                    tokio::select! {
                        _ = sleep(self.config.poll_interval) => {},
                        _ = shutdown.wait() => {
                            debug!(worker_id = self.id, "Worker interrupted during idle");
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!(worker_id = self.id, error = %e, "Failed to receive from queue");
                    tokio::select! {
                        _ = sleep(self.config.error_backoff) => {},
                        _ = shutdown.wait() => {
                            debug!(worker_id = self.id, "Worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        self.state.send_replace(WorkerState::Stopped);
        info!(worker_id = self.id, "Worker stopped");
    }

    /// Receive and handle at most one message
    ///
    /// Only a failed `receive` is reported as an error; delete/extend
    /// failures are logged and absorbed.
    pub async fn process_next(&self) -> Result<CycleOutcome> {
        let message = match self.queue.receive().await? {
            Some(m) => m,
            None => return Ok(CycleOutcome::Empty),
        };

        self.state.send_replace(WorkerState::Processing);
        let outcome = self.handle_message(message).await;
        self.state.send_replace(WorkerState::Idle);
        Ok(outcome)
    }

    async fn handle_message(&self, message: QueueMessage) -> CycleOutcome {
        let task = match Task::from_bytes(&message.body) {
            Ok(task) => task,
            Err(e) => {
                error!(
                    worker_id = self.id,
                    message_id = %message.id,
                    error = %e,
                    "Discarding poison message"
                );
                self.delete(&message.id).await;
                return CycleOutcome::Discarded;
            }
        };

        debug!(
            worker_id = self.id,
            message_id = %message.id,
            tenant_id = %task.tenant_id(),
            event = %task.payload().event,
            receive_count = message.receive_count,
            "Delivering callback"
        );

        match self.deliver(task).await {
            Ok(()) => {
                info!(worker_id = self.id, message_id = %message.id, "Callback delivered");
                self.delete(&message.id).await;
                CycleOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    worker_id = self.id,
                    message_id = %message.id,
                    receive_count = message.receive_count,
                    retry_in_ms = self.config.retry_delay.as_millis() as u64,
                    error = %e,
                    "Callback delivery failed, will retry"
                );
                self.extend(&message.id).await;
                CycleOutcome::Retried
            }
        }
    }

    /// Invoke the sender in its own task so a panic stays contained
    async fn deliver(&self, task: Task) -> std::result::Result<(), SendError> {
        let sender = Arc::clone(&self.sender);
        let handle = tokio::spawn(async move {
            sender
                .send_callback(task.tenant_id(), task.payload())
                .await
        });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(SendError::Panicked(describe_join_error(join_err))),
        }
    }

    async fn delete(&self, id: &MessageId) {
        if let Err(e) = self.queue.delete(id).await {
            warn!(worker_id = self.id, message_id = %id, error = %e, "Failed to delete message");
        }
    }

    async fn extend(&self, id: &MessageId) {
        if let Err(e) = self.queue.extend(id, self.config.retry_delay).await {
            warn!(worker_id = self.id, message_id = %id, error = %e, "Failed to extend message visibility");
        }
    }
}
