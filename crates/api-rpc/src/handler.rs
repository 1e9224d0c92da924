//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::to_rpc_error;
use crate::types::{EnqueueRequest, EnqueueResponse, StatsResponse};
use courier_core::application::{producer, PoolMonitor, TaskProducer};
use courier_core::port::QueueInspector;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    producer: TaskProducer,
    inspector: Arc<dyn QueueInspector>,
    monitor: PoolMonitor,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(
        producer: TaskProducer,
        inspector: Arc<dyn QueueInspector>,
        monitor: PoolMonitor,
    ) -> Self {
        Self {
            producer,
            inspector,
            monitor,
            start_time: Instant::now(),
        }
    }

    /// callback.enqueue.v1
    pub async fn enqueue(
        &self,
        params: EnqueueRequest,
    ) -> Result<EnqueueResponse, ErrorObjectOwned> {
        let tenant_id = params.tenant_id.clone();
        let req = producer::EnqueueRequest {
            tenant_id: params.tenant_id,
            event: params.event,
            url: params.url,
            data: params.data,
        };

        let message_id = self.producer.enqueue(req).await.map_err(to_rpc_error)?;
        info!(message_id = %message_id, tenant_id = %tenant_id, "Callback accepted");

        Ok(EnqueueResponse {
            message_id,
            tenant_id,
        })
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> Result<StatsResponse, ErrorObjectOwned> {
        let stats = self.inspector.stats().await.map_err(to_rpc_error)?;

        Ok(StatsResponse {
            total_messages: stats.total,
            visible_messages: stats.visible,
            in_flight_messages: stats.in_flight,
            workers: self.monitor.worker_states(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }
}
