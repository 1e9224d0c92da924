// Callback Sender Port
// Abstraction for the outbound delivery of a single task

use crate::domain::{CallbackPayload, TenantId};
use async_trait::async_trait;
use thiserror::Error;

/// Delivery errors
///
/// The worker treats every variant as a transient failure; the distinction
/// only matters to the sender's own logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Destination rejected callback with status {status}")]
    Rejected { status: u16 },

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Sender panicked: {0}")]
    Panicked(String),
}

/// Callback Sender trait
///
/// Implementations:
/// - HttpCallbackSender: POSTs the payload to its target url (infra-http)
/// - ScriptedSender: scripted outcomes for tests (see `mocks`)
#[async_trait]
pub trait CallbackSender: Send + Sync {
    /// Deliver one callback for `tenant_id`
    ///
    /// Timeouts are the implementation's responsibility; the caller never
    /// cancels an in-flight call.
    async fn send_callback(
        &self,
        tenant_id: &TenantId,
        payload: &CallbackPayload,
    ) -> Result<(), SendError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Outcome of a single scripted call
    #[derive(Debug, Clone)]
    pub enum Outcome {
        Succeed,
        Fail(SendError),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Sender that replays a script, then falls back to a fixed outcome
    pub struct ScriptedSender {
        script: Mutex<VecDeque<Outcome>>,
        fallback: Outcome,
        delay: Option<Duration>,
        calls: Mutex<Vec<(TenantId, CallbackPayload)>>,
    }

    impl ScriptedSender {
        pub fn new(fallback: Outcome) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback,
                delay: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn new_success() -> Self {
            Self::new(Outcome::Succeed)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(Outcome::Fail(SendError::Transport(message.into())))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(Outcome::Panic(message.into()))
        }

        /// Fail the first `times` calls, then succeed
        pub fn fail_then_succeed(times: usize) -> Self {
            let sender = Self::new_success();
            {
                let mut script = sender.script.lock().unwrap();
                for _ in 0..times {
                    script.push_back(Outcome::Fail(SendError::Rejected { status: 503 }));
                }
            }
            sender
        }

        /// Sleep for `delay` inside every call (simulates a slow destination)
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls(&self) -> Vec<(TenantId, CallbackPayload)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn tenants(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .map(|(tenant, _)| tenant.as_str().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl CallbackSender for ScriptedSender {
        async fn send_callback(
            &self,
            tenant_id: &TenantId,
            payload: &CallbackPayload,
        ) -> Result<(), SendError> {
            self.calls
                .lock()
                .unwrap()
                .push((tenant_id.clone(), payload.clone()));

            let outcome = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match outcome {
                Outcome::Succeed => Ok(()),
                Outcome::Fail(e) => Err(e),
                Outcome::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            }
        }
    }
}
