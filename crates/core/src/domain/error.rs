// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Tenant id must not be empty")]
    EmptyTenantId,

    #[error("Callback url must not be empty")]
    EmptyCallbackUrl,

    #[error("Invalid callback url: {0}")]
    InvalidCallbackUrl(String),

    #[error("Event type must not be empty")]
    EmptyEventType,

    #[error("Malformed task body: {0}")]
    MalformedTask(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
