//! API Client Integration Tests
//!
//! Drives the real HTTP client against a mock OpenAI-compatible server,
//! with the retry layer on top.

mod common;

use common::fixtures::*;
use std::sync::Arc;
use std::time::Duration;
use updater::config::ApiConfig;
use updater::http::{ApiClient, CallError, GenerationService, RemoteService, RetryPolicy};
use updater::translation::Translator;

fn remote(server: &MockGenerationServer, max_attempts: u32) -> RemoteService {
    let client = ApiClient::new(&server.api_config()).unwrap();
    RemoteService::new(
        Arc::new(client),
        RetryPolicy::fixed(max_attempts, Duration::from_millis(5)),
    )
}

#[tokio::test]
async fn test_client_requires_api_key() {
    let config = ApiConfig {
        api_key: None,
        ..ApiConfig::default()
    };
    let err = ApiClient::new(&config).err().unwrap();
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn test_chat_completion_returns_message_content() {
    let server = MockGenerationServer::start().await;
    server.mock_chat_reply("Fresh marketing copy").await;

    let result = remote(&server, 3).generate_text("write something").await.unwrap();

    assert_eq!(result.value, "Fresh marketing copy");
    assert_eq!(result.attempts, 1);

    let requests = server.server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["messages"][1]["content"], "write something");
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        &format!("Bearer {}", TEST_API_KEY)
    );
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockGenerationServer::start().await;
    server.mock_chat_failures(503, 2).await;
    server.mock_chat_reply("recovered").await;

    let result = remote(&server, 3).generate_text("hello").await.unwrap();

    assert_eq!(result.value, "recovered");
    assert_eq!(result.attempts, 3);
    assert_eq!(server.request_count("/chat/completions").await, 3);
}

#[tokio::test]
async fn test_rate_limit_exhausts_attempts() {
    let server = MockGenerationServer::start().await;
    server.mock_chat_failures(429, 10).await;

    let err = remote(&server, 3).generate_text("hello").await.unwrap_err();

    assert!(err.transient);
    assert_eq!(err.attempts, 3);
    assert_eq!(server.request_count("/chat/completions").await, 3);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockGenerationServer::start().await;
    server.mock_chat_failures(401, 10).await;

    let err = remote(&server, 3).generate_text("hello").await.unwrap_err();

    assert!(!err.transient);
    assert_eq!(err.attempts, 1);
    assert_eq!(server.request_count("/chat/completions").await, 1);
}

#[tokio::test]
async fn test_image_generation_decodes_payload() {
    let server = MockGenerationServer::start().await;
    server.mock_image_failures(500, 1).await;
    server.mock_image_ok(FAKE_PNG).await;

    let image = remote(&server, 3).generate_image("banner").await.unwrap();

    assert_eq!(image.value, FAKE_PNG);
    assert_eq!(image.attempts, 2);

    let requests = server.server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(body["response_format"], "b64_json");
    assert_eq!(body["n"], 1);
}

#[tokio::test]
async fn test_status_probe_reports_model_count() {
    let server = MockGenerationServer::start().await;
    server.mock_models_ok(4).await;

    let client = ApiClient::new(&server.api_config()).unwrap();
    let status = client.check_status().await;

    assert!(status.available);
    assert_eq!(status.status_code, Some(200));
    assert_eq!(status.models, Some(4));
}

#[tokio::test]
async fn test_status_probe_reports_unavailable() {
    let server = MockGenerationServer::start().await;
    server.mock_models_status(503).await;

    let client = ApiClient::new(&server.api_config()).unwrap();
    let status = client.check_status().await;

    assert!(!status.available);
    assert_eq!(status.status_code, Some(503));
    assert!(status.message.contains("503"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_unavailable() {
    let config = ApiConfig {
        endpoint: "http://127.0.0.1:9".to_string(),
        api_key: Some(TEST_API_KEY.to_string()),
        connect_timeout_seconds: 1,
        request_timeout_seconds: 2,
        ..ApiConfig::default()
    };
    let client = ApiClient::new(&config).unwrap();
    assert!(!client.check_status().await.available);
}

#[tokio::test]
async fn test_body_stalled_after_headers_is_transient() {
    let base_url = start_stalled_body_server().await;
    let config = ApiConfig {
        endpoint: base_url,
        api_key: Some(TEST_API_KEY.to_string()),
        connect_timeout_seconds: 1,
        request_timeout_seconds: 1,
        ..ApiConfig::default()
    };
    let client = Arc::new(ApiClient::new(&config).unwrap());

    let err = client.complete("system", "user", 0.5).await.unwrap_err();
    assert!(matches!(err, CallError::Transient(_)), "got {:?}", err);

    let remote = RemoteService::new(client, RetryPolicy::fixed(2, Duration::from_millis(5)));
    let err = remote.generate_text("hello").await.unwrap_err();
    assert!(err.transient);
    assert_eq!(err.attempts, 2);
}

#[tokio::test]
async fn test_translation_round_trip_over_http() {
    let server = MockGenerationServer::start().await;
    server
        .mock_chat_reply("```json\n{\"greeting\": \"Hallo __TAG__PGI+V2VsdDwvYj4=__TAG__\",}\n```")
        .await;

    let source: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(r#"{"greeting": "Hello <b>World</b>"}"#).unwrap();
    let translated = Translator::new(remote(&server, 1))
        .translate_map(&source, "de")
        .await
        .unwrap();

    assert_eq!(translated["greeting"], "Hallo <b>Welt</b>");
}
