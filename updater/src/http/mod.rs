//! Remote generation service client
//!
//! Talks to an OpenAI-compatible endpoint for text generation, translation
//! and image generation.
//!
//! # Layers
//!
//! ```text
//! Task executor → RemoteService (retry + backoff) → GenerationService (one attempt)
//!                                                          ↓
//!                                                     ApiClient (reqwest)
//! ```
//!
//! `GenerationService` performs exactly one attempt and classifies its failure
//! as transient or permanent. `RemoteService` owns the retry policy, so tests
//! can swap the backend without touching retry behaviour.

pub mod api_client;
pub mod retry;

pub use api_client::ApiClient;
pub use retry::{call_with_retry, Attempted, Backoff, CallError, RetryPolicy};

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::errors::RemoteServiceError;
use crate::prompts;

/// Result of the lightweight availability probe.
#[derive(Debug, Clone, Serialize)]
pub struct ApiStatus {
    pub available: bool,
    pub status_code: Option<u16>,
    pub models: Option<usize>,
    pub message: String,
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// One chat completion; returns the assistant message text.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, CallError>;

    /// One image generation; returns the decoded image bytes.
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, CallError>;

    async fn check_status(&self) -> ApiStatus;
}

#[derive(Clone)]
pub struct RemoteService {
    backend: Arc<dyn GenerationService>,
    policy: RetryPolicy,
}

impl RemoteService {
    pub fn new(backend: Arc<dyn GenerationService>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn generate_text(&self, prompt: &str) -> Result<Attempted<String>, RemoteServiceError> {
        call_with_retry("generate_text", &self.policy, || {
            self.backend.complete(
                prompts::MARKETING_SYSTEM_PROMPT,
                prompt,
                prompts::TEXT_TEMPERATURE,
            )
        })
        .await
    }

    pub async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<Attempted<String>, RemoteServiceError> {
        let instruction = prompts::translation_instruction(target_language);
        let operation = format!("translate_text[{}]", target_language);
        call_with_retry(&operation, &self.policy, || {
            self.backend
                .complete(&instruction, text, prompts::TRANSLATION_TEMPERATURE)
        })
        .await
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
    ) -> Result<Attempted<Vec<u8>>, RemoteServiceError> {
        self.generate_image_with(&self.policy, prompt).await
    }

    /// Image generation under a caller-supplied policy.
    pub async fn generate_image_with(
        &self,
        policy: &RetryPolicy,
        prompt: &str,
    ) -> Result<Attempted<Vec<u8>>, RemoteServiceError> {
        call_with_retry("generate_image", policy, || self.backend.generate_image(prompt)).await
    }

    pub async fn check_status(&self) -> ApiStatus {
        self.backend.check_status().await
    }
}
