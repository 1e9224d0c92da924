// Task Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant identifier (opaque, non-empty)
///
/// Used for routing and logging only. Never an authorization input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(DomainError::EmptyTenantId);
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Callback payload: event type, target URI and arbitrary event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub event: String,
    pub url: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CallbackPayload {
    pub fn new(event: impl Into<String>, url: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            url: url.into(),
            data,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.event.trim().is_empty() {
            return Err(DomainError::EmptyEventType);
        }
        if self.url.trim().is_empty() {
            return Err(DomainError::EmptyCallbackUrl);
        }
        // Only http(s) destinations are deliverable
        let url = url::Url::parse(&self.url)
            .map_err(|e| DomainError::InvalidCallbackUrl(format!("{}: {}", self.url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(DomainError::InvalidCallbackUrl(format!(
                "unsupported scheme '{}' in {}",
                other, self.url
            ))),
        }
    }
}

/// Unit of delivery work (immutable once enqueued)
///
/// A task carries no identity of its own; the queue assigns a
/// [`MessageId`](crate::domain::MessageId) when it is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    tenant_id: TenantId,
    payload: CallbackPayload,
}

impl Task {
    /// Create a new task, rejecting an empty event type or url
    pub fn new(tenant_id: TenantId, payload: CallbackPayload) -> Result<Self> {
        payload.validate()?;
        Ok(Self { tenant_id, payload })
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn payload(&self) -> &CallbackPayload {
        &self.payload
    }

    /// Serialize into the queue message body
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a queue message body
    ///
    /// Any failure here marks the message as poison: it can never be
    /// delivered and must not be retried.
    pub fn from_bytes(body: &[u8]) -> Result<Self> {
        let task: Task = serde_json::from_slice(body)
            .map_err(|e| DomainError::MalformedTask(e.to_string()))?;
        task.payload
            .validate()
            .map_err(|e| DomainError::MalformedTask(e.to_string()))?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_task() -> Task {
        Task::new(
            TenantId::new("tenant-a").unwrap(),
            CallbackPayload::new(
                "user.created",
                "https://hooks.example.com/a",
                json!({"user": {"id": 42, "name": "Ada"}, "tags": ["x", "y"]}),
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_tenant_rejected() {
        assert_eq!(TenantId::new(""), Err(DomainError::EmptyTenantId));
        assert_eq!(TenantId::new("   "), Err(DomainError::EmptyTenantId));
    }

    #[test]
    fn test_empty_url_rejected() {
        let result = Task::new(
            TenantId::new("t").unwrap(),
            CallbackPayload::new("user.created", "", json!({})),
        );
        assert_eq!(result, Err(DomainError::EmptyCallbackUrl));
    }

    #[test]
    fn test_undeliverable_url_rejected() {
        for url in ["not a url", "ftp://files.example.com/drop", "mailto:ops@example.com"] {
            let result = Task::new(
                TenantId::new("t").unwrap(),
                CallbackPayload::new("user.created", url, json!({})),
            );
            assert!(
                matches!(result, Err(DomainError::InvalidCallbackUrl(_))),
                "{} accepted",
                url
            );
        }
    }

    #[test]
    fn test_undeliverable_url_in_body_is_malformed() {
        let body = br#"{"tenant_id":"t","payload":{"event":"e","url":"ftp://x/y","data":null}}"#;
        let err = Task::from_bytes(body).unwrap_err();
        assert!(matches!(err, DomainError::MalformedTask(_)));
    }

    #[test]
    fn test_bytes_are_stable_across_round_trip() {
        let task = sample_task();
        let first = task.to_bytes().unwrap();
        let decoded = Task::from_bytes(&first).unwrap();
        let second = decoded.to_bytes().unwrap();

        assert_eq!(decoded, task);
        assert_eq!(first, second);
    }

    #[test]
    fn test_garbage_body_is_malformed() {
        let err = Task::from_bytes(b"\x00not json").unwrap_err();
        assert!(matches!(err, DomainError::MalformedTask(_)));
    }

    #[test]
    fn test_empty_tenant_in_body_is_malformed() {
        let body = br#"{"tenant_id":"","payload":{"event":"e","url":"http://x","data":null}}"#;
        let err = Task::from_bytes(body).unwrap_err();
        assert!(matches!(err, DomainError::MalformedTask(_)));
    }

    #[test]
    fn test_missing_data_defaults_to_null() {
        let body = br#"{"tenant_id":"t","payload":{"event":"e","url":"http://x"}}"#;
        let task = Task::from_bytes(body).unwrap();
        assert_eq!(task.payload().data, serde_json::Value::Null);
    }
}
