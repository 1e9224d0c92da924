// Domain Layer - Pure business logic and entities

pub mod error;
pub mod message;
pub mod task;

// Re-exports
pub use error::DomainError;
pub use message::{MessageId, QueueMessage, QueueStats};
pub use task::{CallbackPayload, Task, TenantId};
