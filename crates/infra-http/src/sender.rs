// HTTP CallbackSender Implementation
// POSTs the JSON payload to its target url; transport failures and non-2xx
// responses become SendError

use async_trait::async_trait;
use courier_core::domain::{CallbackPayload, TenantId};
use courier_core::port::{CallbackSender, SendError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info_span, warn, Instrument};
use url::Url;

/// Configuration for the callback HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout for a whole delivery attempt.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("Courier-Webhook-Delivery/{}", courier_core::VERSION),
            max_redirects: 3,
        }
    }
}

/// Callback sender backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpCallbackSender {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpCallbackSender {
    /// # Errors
    ///
    /// Returns `SendError::Transport` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| SendError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self, SendError> {
        Self::new(ClientConfig::default())
    }

    fn destination(payload: &CallbackPayload) -> Result<Url, SendError> {
        let url = Url::parse(&payload.url)
            .map_err(|e| SendError::InvalidDestination(format!("{}: {}", payload.url, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SendError::InvalidDestination(format!(
                "unsupported scheme '{}' in {}",
                other, payload.url
            ))),
        }
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn send_callback(
        &self,
        tenant_id: &TenantId,
        payload: &CallbackPayload,
    ) -> Result<(), SendError> {
        let url = Self::destination(payload)?;

        let span = info_span!(
            "callback_delivery",
            tenant_id = %tenant_id,
            event = %payload.event,
            url = %url
        );

        async move {
            let start_time = Instant::now();

            let response = self
                .client
                .post(url)
                .json(payload)
                .send()
                .await
                .map_err(|e| {
                    warn!(
                        duration_ms = start_time.elapsed().as_millis() as u64,
                        "Request failed: {}", e
                    );
                    if e.is_timeout() {
                        SendError::Timeout(self.config.timeout.as_millis() as u64)
                    } else if e.is_connect() {
                        SendError::Transport(format!("connection failed: {}", e))
                    } else {
                        SendError::Transport(e.to_string())
                    }
                })?;

            let status = response.status();
            debug!(
                status = status.as_u16(),
                duration_ms = start_time.elapsed().as_millis() as u64,
                "Received response"
            );

            if status.is_success() {
                Ok(())
            } else {
                Err(SendError::Rejected {
                    status: status.as_u16(),
                })
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tenant() -> TenantId {
        TenantId::new("tenant-a").unwrap()
    }

    fn payload(url: String) -> CallbackPayload {
        CallbackPayload::new("user.created", url, json!({"user_id": 42}))
    }

    fn fast_sender() -> HttpCallbackSender {
        HttpCallbackSender::new(ClientConfig {
            timeout: Duration::from_millis(200),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_json_payload() {
        let server = MockServer::start().await;
        let payload = payload(format!("{}/hooks/users", server.uri()));

        Mock::given(method("POST"))
            .and(path("/hooks/users"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "event": "user.created",
                "url": payload.url,
                "data": {"user_id": 42}
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        assert_ok!(fast_sender().send_callback(&tenant(), &payload).await);
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = assert_err!(
            fast_sender()
                .send_callback(&tenant(), &payload(format!("{}/cb", server.uri())))
                .await
        );
        assert_eq!(err, SendError::Rejected { status: 500 });
    }

    #[tokio::test]
    async fn test_slow_destination_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = fast_sender()
            .send_callback(&tenant(), &payload(format!("{}/cb", server.uri())))
            .await
            .unwrap_err();
        assert_eq!(err, SendError::Timeout(200));
    }

    #[tokio::test]
    async fn test_unreachable_destination_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = fast_sender()
            .send_callback(&tenant(), &payload(format!("http://127.0.0.1:{}/cb", port)))
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::Transport(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_invalid_destination_never_sends() {
        let err = fast_sender()
            .send_callback(&tenant(), &payload("ftp://files.example.com/x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::InvalidDestination(_)));

        let err = fast_sender()
            .send_callback(&tenant(), &payload("not a url".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::InvalidDestination(_)));
    }
}
