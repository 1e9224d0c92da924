// Queue Message Domain Model

use serde::{Deserialize, Serialize};

/// Queue-assigned message id
pub type MessageId = String;

/// A message handed out by `DurableQueue::receive`
///
/// Owned by the queue; the worker only reads the body and refers back to
/// the message by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: MessageId,
    pub body: Vec<u8>,
    /// Number of times this message has been received (diagnostics only)
    pub receive_count: u32,
}

impl QueueMessage {
    pub fn new(id: impl Into<String>, body: Vec<u8>, receive_count: u32) -> Self {
        Self {
            id: id.into(),
            body,
            receive_count,
        }
    }
}

/// Message counts by visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: i64,
    /// Receivable right now
    pub visible: i64,
    /// Received (or extended) and still inside their window
    pub in_flight: i64,
}
