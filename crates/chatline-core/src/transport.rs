//! Chat endpoint transport
//!
//! `ChatTransport` is the seam between the session and the network. The
//! reqwest-backed `HttpTransport` talks to the real backend; tests substitute
//! scripted implementations.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::composer::{ComposedRequest, INTEGRITY_HEADER};
use crate::error::{ChatError, ChatResult};
use crate::message::ResponseMetrics;
use crate::models::ModelMetadata;

/// Successful body of `POST /api/chat`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub input_tokens: Option<u32>,
    #[serde(default)]
    pub output_tokens: Option<u32>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

impl ChatResponse {
    pub fn metrics(&self) -> ResponseMetrics {
        ResponseMetrics {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            duration_seconds: self.duration_seconds,
        }
    }
}

/// Error envelope the backend uses for non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: serde_json::Value,
}

pub type TransportFuture<T> = Pin<Box<dyn Future<Output = ChatResult<T>> + Send>>;

/// Trait for reaching the chat backend
///
/// Object-safe so the session can hold an `Arc<dyn ChatTransport>`.
pub trait ChatTransport: Send + Sync {
    /// Send a signed request body to the chat endpoint
    fn send_chat(&self, request: ComposedRequest) -> TransportFuture<ChatResponse>;

    /// Fetch the remote model catalog
    fn fetch_models(&self) -> TransportFuture<Vec<ModelMetadata>>;
}

/// Transport over HTTPS to the backend's `/api` routes
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> ChatResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chatline/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}/api/{}", self.base_url, route)
    }

    async fn post_chat(&self, request: ComposedRequest) -> ChatResult<ChatResponse> {
        let url = self.url("chat");
        debug!(url = %url, bytes = request.body.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(INTEGRITY_HEADER, request.digest.as_str())
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorEnvelope>(&body)
                .ok()
                .map(|envelope| match envelope.detail {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                });
            warn!(status = status.as_u16(), detail = ?detail, "Chat endpoint returned error status");
            return Err(ChatError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_slice(&body).map_err(|e| ChatError::Malformed(e.to_string()))
    }

    async fn get_models(&self) -> ChatResult<Vec<ModelMetadata>> {
        let url = self.url("models");
        debug!(url = %url, "Fetching model catalog");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                detail: None,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ChatError::Malformed(e.to_string()))
    }

    /// Call `GET /api/health`
    pub async fn health(&self) -> ChatResult<()> {
        let response = self.client.get(self.url("health")).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ChatError::Status {
                status: status.as_u16(),
                detail: None,
            })
        }
    }
}

impl ChatTransport for HttpTransport {
    fn send_chat(&self, request: ComposedRequest) -> TransportFuture<ChatResponse> {
        let this = self.clone();
        Box::pin(async move { this.post_chat(request).await })
    }

    fn fetch_models(&self) -> TransportFuture<Vec<ModelMetadata>> {
        let this = self.clone();
        Box::pin(async move { this.get_models().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::integrity_digest;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn signed(body: &str) -> ComposedRequest {
        let body = body.as_bytes().to_vec();
        ComposedRequest {
            digest: integrity_digest(&body),
            body,
        }
    }

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_send_chat_carries_digest_header() {
        let server = MockServer::start().await;
        let request = signed(r#"{"messages":[],"model":"gpt-4.1-mini"}"#);

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("content-type", "application/json"))
            .and(header(INTEGRITY_HEADER, request.digest.as_str()))
            .and(body_bytes(request.body.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Hi",
                "responseId": "resp_1",
                "inputTokens": 10,
                "outputTokens": 20,
                "durationSeconds": 0.35
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport(&server).send_chat(request).await.unwrap();

        assert_eq!(response.message, "Hi");
        assert_eq!(response.response_id.as_deref(), Some("resp_1"));
        assert_eq!(response.metrics().total_tokens(), Some(30));
    }

    #[tokio::test]
    async fn test_minimal_response_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "message": "Hi" })))
            .mount(&server)
            .await;

        let response = transport(&server).send_chat(signed("{}")).await.unwrap();
        assert_eq!(response.message, "Hi");
        assert!(response.response_id.is_none());
        assert!(response.metrics().is_empty());
    }

    #[tokio::test]
    async fn test_error_status_with_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(502).set_body_json(serde_json::json!({ "detail": "upstream timed out" })),
            )
            .mount(&server)
            .await;

        let err = transport(&server).send_chat(signed("{}")).await.unwrap_err();
        match err {
            ChatError::Status { status, detail } => {
                assert_eq!(status, 502);
                assert_eq!(detail.as_deref(), Some("upstream timed out"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_with_success_shaped_body_still_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({ "message": "Hi" })))
            .mount(&server)
            .await;

        let err = transport(&server).send_chat(signed("{}")).await.unwrap_err();
        assert!(matches!(err, ChatError::Status { status: 500, detail: None }));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = transport(&server).send_chat(signed("{}")).await.unwrap_err();
        assert!(matches!(err, ChatError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_fetch_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": "gpt-5",
                "supportsTemperature": false,
                "supportsReasoningEffort": true,
                "reasoningEffortOptions": ["low", "medium", "high"],
                "defaultReasoningEffort": "low",
                "supportsWebSearch": true,
                "supportsPreviousResponse": true
            }])))
            .mount(&server)
            .await;

        let models = transport(&server).fetch_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "gpt-5");
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ok" })))
            .mount(&server)
            .await;

        assert!(transport(&server).health().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let transport = HttpTransport::new(&uri, Duration::from_secs(2)).unwrap();
        let err = transport.send_chat(signed("{}")).await.unwrap_err();
        assert!(matches!(err, ChatError::Http(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = HttpTransport::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.url("chat"), "http://localhost:8000/api/chat");
    }
}
