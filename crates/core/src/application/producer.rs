// Producer - Enqueue use case

use crate::domain::{CallbackPayload, MessageId, Task, TenantId};
use crate::error::Result;
use crate::port::DurableQueue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Enqueue request (raw producer input)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub tenant_id: String,
    pub event: String,
    pub url: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Producer-facing handle onto the shared queue
///
/// Cheap to clone and independent of worker state, so it can be handed to
/// HTTP handlers, event hooks, or even code running inside a sender.
#[derive(Clone)]
pub struct TaskProducer {
    queue: Arc<dyn DurableQueue>,
}

impl TaskProducer {
    pub fn new(queue: Arc<dyn DurableQueue>) -> Self {
        Self { queue }
    }

    /// Serialize and enqueue a task
    ///
    /// `Ok` means accepted for eventual delivery, not delivered.
    pub async fn send(&self, task: &Task) -> Result<MessageId> {
        let body = task.to_bytes()?;
        let id = self.queue.send(&body).await?;
        debug!(
            message_id = %id,
            tenant_id = %task.tenant_id(),
            event = %task.payload().event,
            "Task enqueued"
        );
        Ok(id)
    }

    /// Validate a raw request and enqueue it
    pub async fn enqueue(&self, req: EnqueueRequest) -> Result<MessageId> {
        let tenant_id = TenantId::new(req.tenant_id)?;
        let task = Task::new(tenant_id, CallbackPayload::new(req.event, req.url, req.data))?;
        self.send(&task).await
    }
}
