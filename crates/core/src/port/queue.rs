// Durable Queue Port (Interface)
// At-least-once message store with visibility-timeout semantics

use crate::domain::{MessageId, QueueMessage, QueueStats};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Durable queue consumed by the delivery workers
///
/// Implementations:
/// - SqliteQueue: durable store (infra-sqlite)
/// - InMemoryQueue: call-recording queue for tests (see `mocks`)
///
/// Mutual exclusion over message visibility is the implementation's job:
/// a received message must not be handed to another receiver until its
/// visibility window expires.
#[async_trait]
pub trait DurableQueue: Send + Sync {
    /// Persist an opaque body, returning once it is durable
    async fn send(&self, body: &[u8]) -> Result<MessageId>;

    /// Take at most one visible message and hide it for the visibility window
    ///
    /// `Ok(None)` means the queue has nothing visible right now, which is
    /// distinct from a failed receive.
    async fn receive(&self) -> Result<Option<QueueMessage>>;

    /// Permanently remove a message (idempotent, unknown ids are not an error)
    async fn delete(&self, id: &MessageId) -> Result<()>;

    /// Reset the message's invisibility window to `duration` from now
    async fn extend(&self, id: &MessageId, duration: Duration) -> Result<()>;
}

/// Read-only view of queue depth (admin/diagnostics)
#[async_trait]
pub trait QueueInspector: Send + Sync {
    async fn stats(&self) -> Result<QueueStats>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;
    use std::time::Instant;

    /// A recorded queue operation
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum QueueCall {
        Send(MessageId),
        Receive(Option<MessageId>),
        Delete(MessageId),
        Extend(MessageId, Duration),
    }

    struct Entry {
        id: MessageId,
        body: Vec<u8>,
        visible_at: Instant,
        receive_count: u32,
    }

    #[derive(Default)]
    struct Failures {
        receive: usize,
        delete: usize,
        extend: usize,
    }

    #[derive(Default)]
    struct State {
        entries: Vec<Entry>,
        calls: Vec<QueueCall>,
        failures: Failures,
        next_id: u64,
    }

    /// In-memory queue with real visibility windows and a call log
    pub struct InMemoryQueue {
        visibility_timeout: Duration,
        state: Mutex<State>,
    }

    impl InMemoryQueue {
        pub fn new(visibility_timeout: Duration) -> Self {
            Self {
                visibility_timeout,
                state: Mutex::new(State::default()),
            }
        }

        /// Insert a raw body directly (e.g. a malformed one), bypassing the log
        pub fn push_raw(&self, body: impl Into<Vec<u8>>) -> MessageId {
            let mut state = self.state.lock().unwrap();
            Self::push_locked(&mut state, body.into())
        }

        /// Make the next `n` receives fail
        pub fn fail_next_receives(&self, n: usize) {
            self.state.lock().unwrap().failures.receive = n;
        }

        /// Make the next `n` deletes fail
        pub fn fail_next_deletes(&self, n: usize) {
            self.state.lock().unwrap().failures.delete = n;
        }

        /// Make the next `n` extends fail
        pub fn fail_next_extends(&self, n: usize) {
            self.state.lock().unwrap().failures.extend = n;
        }

        pub fn calls(&self) -> Vec<QueueCall> {
            self.state.lock().unwrap().calls.clone()
        }

        pub fn deletes(&self) -> Vec<MessageId> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    QueueCall::Delete(id) => Some(id),
                    _ => None,
                })
                .collect()
        }

        pub fn extends(&self) -> Vec<MessageId> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    QueueCall::Extend(id, _) => Some(id),
                    _ => None,
                })
                .collect()
        }

        pub fn delete_count(&self, id: &str) -> usize {
            self.deletes().iter().filter(|d| d.as_str() == id).count()
        }

        pub fn extend_count(&self, id: &str) -> usize {
            self.extends().iter().filter(|e| e.as_str() == id).count()
        }

        /// Messages still stored (visible or not)
        pub fn len(&self) -> usize {
            self.state.lock().unwrap().entries.len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        fn push_locked(state: &mut State, body: Vec<u8>) -> MessageId {
            state.next_id += 1;
            let id = format!("mem-{}", state.next_id);
            state.entries.push(Entry {
                id: id.clone(),
                body,
                visible_at: Instant::now(),
                receive_count: 0,
            });
            id
        }

        fn take_failure(counter: &mut usize) -> bool {
            if *counter > 0 {
                *counter -= 1;
                true
            } else {
                false
            }
        }
    }

    #[async_trait]
    impl DurableQueue for InMemoryQueue {
        async fn send(&self, body: &[u8]) -> Result<MessageId> {
            let mut state = self.state.lock().unwrap();
            let id = Self::push_locked(&mut state, body.to_vec());
            state.calls.push(QueueCall::Send(id.clone()));
            Ok(id)
        }

        async fn receive(&self) -> Result<Option<QueueMessage>> {
            let mut state = self.state.lock().unwrap();
            if Self::take_failure(&mut state.failures.receive) {
                return Err(AppError::Queue("injected receive failure".to_string()));
            }

            let now = Instant::now();
            let visibility_timeout = self.visibility_timeout;
            let message = state
                .entries
                .iter_mut()
                .find(|e| e.visible_at <= now)
                .map(|e| {
                    e.visible_at = now + visibility_timeout;
                    e.receive_count += 1;
                    QueueMessage::new(e.id.clone(), e.body.clone(), e.receive_count)
                });

            state
                .calls
                .push(QueueCall::Receive(message.as_ref().map(|m| m.id.clone())));
            Ok(message)
        }

        async fn delete(&self, id: &MessageId) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(QueueCall::Delete(id.clone()));
            if Self::take_failure(&mut state.failures.delete) {
                return Err(AppError::Queue("injected delete failure".to_string()));
            }
            state.entries.retain(|e| &e.id != id);
            Ok(())
        }

        async fn extend(&self, id: &MessageId, duration: Duration) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(QueueCall::Extend(id.clone(), duration));
            if Self::take_failure(&mut state.failures.extend) {
                return Err(AppError::Queue("injected extend failure".to_string()));
            }
            match state.entries.iter_mut().find(|e| &e.id == id) {
                Some(entry) => {
                    entry.visible_at = Instant::now() + duration;
                    Ok(())
                }
                None => Err(AppError::NotFound(format!("Message {} not found", id))),
            }
        }
    }

    #[async_trait]
    impl QueueInspector for InMemoryQueue {
        async fn stats(&self) -> Result<QueueStats> {
            let state = self.state.lock().unwrap();
            let now = Instant::now();
            let total = state.entries.len() as i64;
            let visible = state.entries.iter().filter(|e| e.visible_at <= now).count() as i64;
            Ok(QueueStats {
                total,
                visible,
                in_flight: total - visible,
            })
        }
    }
}
