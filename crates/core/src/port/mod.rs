// Port Layer - Interfaces for external dependencies

pub mod callback_sender;
pub mod id_provider; // For deterministic testing
pub mod queue;
pub mod time_provider;

// Re-exports
pub use callback_sender::{CallbackSender, SendError};
pub use id_provider::IdProvider;
pub use queue::{DurableQueue, QueueInspector};
pub use time_provider::TimeProvider;
