use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

/// Something that can answer a chat message.
///
/// `ChatClient` talks to the real backend; tests plug in canned replies.
pub trait ChatBackend: Send + Sync + 'static {
    fn send(&self, message: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Clone, Debug)]
pub struct ChatClient {
    client: Client,
    url: Url,
}

impl ChatClient {
    /// Builds a client for the backend at `endpoint` (scheme, host and port).
    pub fn new(endpoint: &str) -> Result<Self> {
        let base = Url::parse(endpoint).map_err(|e| ChatError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ChatError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "not a base URL".to_string(),
            });
        }
        let url = base.join("/api/chat").map_err(|e| ChatError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn query(&self, message: &str) -> Result<String> {
        tracing::debug!(url = %self.url, chars = message.chars().count(), "sending chat request");

        let response = self
            .client
            .post(self.url.clone())
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status));
        }

        let body = response.text().await?;
        let reply: ChatReply = serde_json::from_str(&body)?;
        Ok(reply.response)
    }
}

impl ChatBackend for ChatClient {
    fn send(&self, message: &str) -> impl Future<Output = Result<String>> + Send {
        self.query(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_query_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({ "message": "What is RAG?" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "response": "Retrieval **augmented** generation." })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri()).unwrap();
        let reply = client.query("What is RAG?").await.unwrap();
        assert_eq!(reply, "Retrieval **augmented** generation.");
    }

    #[tokio::test]
    async fn test_query_server_error() {
        let server = MockServer::start().await;
        // The backend sends a JSON body with its 500; it still counts as a failure.
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "response": "Sorry, an error occurred" })),
            )
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri()).unwrap();
        let err = client.query("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Status(s) if s.as_u16() == 500));
    }

    #[tokio::test]
    async fn test_query_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri()).unwrap();
        let err = client.query("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
    }

    #[tokio::test]
    async fn test_query_missing_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "answer": "hi" })))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri()).unwrap();
        assert!(matches!(client.query("hello").await, Err(ChatError::Decode(_))));
    }

    #[tokio::test]
    async fn test_query_unreachable() {
        // Nothing listens on port 9 locally.
        let client = ChatClient::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(client.query("hello").await, Err(ChatError::Network(_))));
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(matches!(
            ChatClient::new("not a url"),
            Err(ChatError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            ChatClient::new("mailto:someone@example.com"),
            Err(ChatError::InvalidEndpoint { .. })
        ));

        let client = ChatClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.url().as_str(), "http://localhost:5000/api/chat");
    }
}
