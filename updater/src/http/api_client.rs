use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::retry::CallError;
use super::{ApiStatus, GenerationService};
use crate::config::ApiConfig;
use crate::constants;
use crate::errors::ConfigError;

/// Single-attempt client for an OpenAI-compatible endpoint.
pub struct ApiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    text_model: String,
    image_model: String,
    image_size: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                field: format!("api.api_key (or {})", constants::http::API_KEY_ENV),
            })?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "api".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }

    async fn post_json(&self, path: &str, payload: Value) -> Result<Value, CallError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to read {} error body: {}", status, e);
                    String::new()
                }
            };
            return Err(classify_status(status, &body));
        }

        // Body read failures (timeout, reset) classify like send failures
        let bytes = response.bytes().await.map_err(classify_send_error)?;

        serde_json::from_slice::<Value>(&bytes)
            .map_err(|e| CallError::Permanent(format!("invalid JSON response: {}", e)))
    }
}

#[async_trait]
impl GenerationService for ApiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, CallError> {
        let payload = json!({
            "model": self.text_model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": temperature
        });

        let body = self.post_json("chat/completions", payload).await?;

        body.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                CallError::Permanent("response missing choices[0].message.content".to_string())
            })
    }

    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, CallError> {
        let payload = json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": self.image_size,
            "response_format": "b64_json"
        });

        let body = self.post_json("images/generations", payload).await?;

        let encoded = body
            .pointer("/data/0/b64_json")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CallError::Permanent("response missing data[0].b64_json".to_string()))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| CallError::Permanent(format!("image payload is not base64: {}", e)))?;

        debug!("Image generated, {} bytes", bytes.len());
        Ok(bytes)
    }

    async fn check_status(&self) -> ApiStatus {
        let response = self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.api_key)
            .timeout(constants::http::STATUS_PROBE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                if status != StatusCode::OK {
                    return ApiStatus {
                        available: false,
                        status_code: Some(status.as_u16()),
                        models: None,
                        message: format!("API responded with status {}", status),
                    };
                }

                match response.json::<Value>().await {
                    Ok(body) => match body.get("data").and_then(|d| d.as_array()) {
                        Some(models) => ApiStatus {
                            available: true,
                            status_code: Some(status.as_u16()),
                            models: Some(models.len()),
                            message: "API service is available".to_string(),
                        },
                        None => ApiStatus {
                            available: false,
                            status_code: Some(status.as_u16()),
                            models: None,
                            message: "API responded but with unexpected format".to_string(),
                        },
                    },
                    Err(e) => ApiStatus {
                        available: false,
                        status_code: Some(status.as_u16()),
                        models: None,
                        message: format!("API returned unreadable body: {}", e),
                    },
                }
            }
            Err(e) => {
                warn!("API status probe failed: {}", e);
                ApiStatus {
                    available: false,
                    status_code: e.status().map(|s| s.as_u16()),
                    models: None,
                    message: e.to_string(),
                }
            }
        }
    }
}

fn classify_send_error(e: reqwest::Error) -> CallError {
    if e.is_builder() {
        CallError::Permanent(format!("invalid request: {}", e))
    } else if e.is_timeout() {
        CallError::Transient(format!("request timed out: {}", e))
    } else {
        CallError::Transient(format!("request failed: {}", e))
    }
}

/// 408, 429 and 5xx are worth retrying; any other non-success status is not.
pub fn classify_status(status: StatusCode, body: &str) -> CallError {
    let snippet: String = body.chars().take(200).collect();
    let message = format!("HTTP {}: {}", status.as_u16(), snippet);

    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        CallError::Transient(message)
    } else {
        CallError::Permanent(message)
    }
}
