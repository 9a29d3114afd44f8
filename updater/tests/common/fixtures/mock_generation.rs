//! Mock OpenAI-compatible endpoint for testing
//!
//! Serves `/models`, `/chat/completions` and `/images/generations` so the
//! real `ApiClient` can be exercised without network access.

use base64::Engine;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use updater::config::ApiConfig;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const TEST_API_KEY: &str = "sk-test-key";

/// Smallest bytes that look like a PNG to a human reading a test failure.
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

pub struct MockGenerationServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockGenerationServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// Client config pointing at this server with a test key.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            endpoint: format!("{}/", self.base_url),
            api_key: Some(TEST_API_KEY.to_string()),
            request_timeout_seconds: 5,
            connect_timeout_seconds: 2,
            ..ApiConfig::default()
        }
    }

    pub async fn mock_models_ok(&self, count: usize) {
        let models: Vec<_> = (0..count)
            .map(|i| json!({ "id": format!("model-{}", i), "object": "model" }))
            .collect();

        Mock::given(method("GET"))
            .and(path("/models"))
            .and(header("authorization", format!("Bearer {}", TEST_API_KEY).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": models
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_models_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "message": "unavailable" }
            })))
            .mount(&self.server)
            .await;
    }

    /// Every chat completion answers with `content`.
    pub async fn mock_chat_reply(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
            .mount(&self.server)
            .await;
    }

    /// The first `failures` chat completions answer with `status`.
    pub async fn mock_chat_failures(&self, status: u16, failures: u64) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream trouble"))
            .up_to_n_times(failures)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_image_ok(&self, bytes: &[u8]) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": 1,
                "data": [{ "b64_json": encoded }]
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_image_failures(&self, status: u16, failures: u64) {
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(status).set_body_string("image backend busy"))
            .up_to_n_times(failures)
            .mount(&self.server)
            .await;
    }

    /// Requests received so far on `route`.
    pub async fn request_count(&self, route: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == route)
            .count()
    }
}

pub fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// Raw TCP endpoint that answers every request with `200` headers and a few
/// body bytes, then stalls. Returns the base URL.
pub async fn start_stalled_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 200\r\n\r\n{\"cho",
                    )
                    .await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });

    format!("http://{}", addr)
}
