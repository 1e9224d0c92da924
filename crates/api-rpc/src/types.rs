//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results.

use courier_core::application::WorkerState;
use serde::{Deserialize, Serialize};

/// callback.enqueue.v1 - Enqueue a callback for delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub tenant_id: String,
    pub event: String,
    pub url: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub message_id: String,
    pub tenant_id: String,
}

/// admin.stats.v1 - Queue depth and worker states
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_messages: i64,
    pub visible_messages: i64,
    pub in_flight_messages: i64,
    pub workers: Vec<WorkerState>,
    pub uptime_seconds: u64,
}
