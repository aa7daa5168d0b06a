//! Client for the remote question-answering endpoint.
//!
//! The endpoint takes `POST {"question": "..."}` and answers
//! `{"response": "..."}` on success, or a non-2xx status with
//! `{"error": "...", "message": "..."}` on failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when asking the endpoint.
#[derive(Debug, Error)]
pub enum AskError {
    /// Connection or transport failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Endpoint answered with a non-2xx status.
    #[error("{reason}")]
    Status { status: u16, reason: String },

    /// Body was not JSON or lacked the `response` field.
    #[error("Malformed response: {0}")]
    MalformedBody(String),

    /// The request task panicked or was cancelled before finishing.
    #[error("Request aborted: {0}")]
    Aborted(String),
}

/// Port to the remote endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AskClient: Send + Sync {
    /// Ask a question and return the answer text.
    async fn ask(&self, question: &str) -> Result<String, AskError>;
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    response: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// HTTP implementation of [`AskClient`].
#[derive(Debug, Clone)]
pub struct HttpAskClient {
    http: reqwest::Client,
    url: String,
}

impl HttpAskClient {
    /// Create a client for the given endpoint URL, with no request timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Create a client with an optional overall request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, AskError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            url: url.into(),
        })
    }

    /// Endpoint URL this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AskClient for HttpAskClient {
    async fn ask(&self, question: &str) -> Result<String, AskError> {
        debug!(url = %self.url, chars = question.chars().count(), "Sending question");

        let response = self
            .http
            .post(&self.url)
            .json(&AskRequest { question })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        if !status.is_success() {
            return Err(AskError::Status {
                status: status.as_u16(),
                reason: failure_reason(status.as_u16(), &body),
            });
        }

        let parsed: AskResponse =
            serde_json::from_str(&body).map_err(|e| AskError::MalformedBody(e.to_string()))?;
        Ok(parsed.response)
    }
}

/// Extract a human-readable reason from a failure body.
fn failure_reason(status: u16, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

    match (non_empty(parsed.error), non_empty(parsed.message)) {
        (Some(error), Some(message)) => format!("{error}: {message}"),
        (Some(reason), None) | (None, Some(reason)) => reason,
        (None, None) => format!("Failed to get response (HTTP {status})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api/ask")
    }

    #[test]
    fn test_failure_reason_variants() {
        assert_eq!(failure_reason(500, r#"{"error":"overloaded"}"#), "overloaded");
        assert_eq!(
            failure_reason(500, r#"{"error":"Error","message":"API Key not configured"}"#),
            "Error: API Key not configured"
        );
        assert_eq!(failure_reason(400, r#"{"message":"Question is required"}"#), "Question is required");
        assert_eq!(failure_reason(404, ""), "Failed to get response (HTTP 404)");
        assert_eq!(failure_reason(502, "<html>bad gateway</html>"), "Failed to get response (HTTP 502)");
    }

    #[tokio::test]
    async fn test_ask_success_sends_question() {
        let router = Router::new().route(
            "/api/ask",
            post(|Json(body): Json<Value>| async move {
                let question = body["question"].as_str().unwrap_or_default().to_string();
                Json(json!({ "response": format!("echo: {question}"), "question": question }))
            }),
        );
        let client = HttpAskClient::new(spawn_server(router).await);

        let answer = client.ask("What is the capital of France?").await.unwrap();
        assert_eq!(answer, "echo: What is the capital of France?");
    }

    #[tokio::test]
    async fn test_answer_starting_with_marker_resolves_as_success() {
        use crate::controller::ChatController;
        use crate::storage::MemoryStore;
        use std::sync::Arc;

        let router = Router::new().route(
            "/api/ask",
            post(|| async { Json(json!({ "response": "❌ is the cross mark emoji" })) }),
        );
        let client = HttpAskClient::new(spawn_server(router).await);
        let mut controller = ChatController::new(MemoryStore::new(), Arc::new(client));

        controller.set_draft("What is this emoji called?");
        let reply = controller.submit().await.unwrap().unwrap();
        assert_eq!(reply.content, "❌ is the cross mark emoji");
        assert!(!reply.is_failure());
    }

    #[tokio::test]
    async fn test_ask_server_error_carries_reason() {
        let router = Router::new().route(
            "/api/ask",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "overloaded" })),
                )
            }),
        );
        let client = HttpAskClient::new(spawn_server(router).await);

        let err = client.ask("hello").await.unwrap_err();
        match &err {
            AskError::Status { status, reason } => {
                assert_eq!(*status, 500);
                assert_eq!(reason, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_ask_missing_field_is_malformed() {
        let router = Router::new().route(
            "/api/ask",
            post(|| async { Json(json!({ "answer": "Paris" })) }),
        );
        let client = HttpAskClient::new(spawn_server(router).await);

        let err = client.ask("hello").await.unwrap_err();
        assert!(matches!(err, AskError::MalformedBody(_)));
    }

    #[tokio::test]
    async fn test_ask_non_json_body_is_malformed() {
        let router = Router::new().route("/api/ask", post(|| async { "plain text" }));
        let client = HttpAskClient::new(spawn_server(router).await);

        let err = client.ask("hello").await.unwrap_err();
        assert!(matches!(err, AskError::MalformedBody(_)));
    }

    #[tokio::test]
    async fn test_ask_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpAskClient::new(format!("http://{addr}/api/ask"));
        let err = client.ask("hello").await.unwrap_err();
        assert!(matches!(err, AskError::Network(_)));
    }

    #[tokio::test]
    async fn test_with_timeout_builds_client() {
        let client =
            HttpAskClient::with_timeout("http://127.0.0.1:1/api/ask", Some(Duration::from_secs(5)))
                .unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:1/api/ask");
    }
}
