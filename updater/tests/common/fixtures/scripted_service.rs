//! In-process `GenerationService` with scripted answers and call counters

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use updater::http::{ApiStatus, CallError, GenerationService, RemoteService, RetryPolicy};
use updater::translation::parse_strict;

use super::mock_generation::FAKE_PNG;

type TextResponder = Box<dyn Fn(&str, &str) -> Result<String, CallError> + Send + Sync>;

pub struct ScriptedService {
    available: AtomicBool,
    text: TextResponder,
    images: Mutex<VecDeque<Result<Vec<u8>, CallError>>>,
    pub text_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl ScriptedService {
    /// Echoes the JSON object found in the user prompt back unchanged.
    pub fn echo() -> Self {
        Self::with_text(|_system, user| Ok(echo_json(user, |v| v.to_string())))
    }

    pub fn with_text<F>(responder: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, CallError> + Send + Sync + 'static,
    {
        Self {
            available: AtomicBool::new(true),
            text: Box::new(responder),
            images: Mutex::new(VecDeque::new()),
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(self) -> Self {
        self.available.store(false, Ordering::SeqCst);
        self
    }

    /// Queues image answers; once the queue is empty every call succeeds.
    pub fn with_images(self, script: Vec<Result<Vec<u8>, CallError>>) -> Self {
        *self.images.lock().unwrap() = script.into();
        self
    }

    pub fn into_remote(self: Arc<Self>) -> RemoteService {
        RemoteService::new(self, fast_policy(3))
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _temperature: f32,
    ) -> Result<String, CallError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        (self.text)(system_prompt, user_prompt)
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Vec<u8>, CallError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FAKE_PNG.to_vec()))
    }

    async fn check_status(&self) -> ApiStatus {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let available = self.available.load(Ordering::SeqCst);
        ApiStatus {
            available,
            status_code: Some(if available { 200 } else { 503 }),
            models: available.then_some(1),
            message: if available {
                "API service is available".to_string()
            } else {
                "API responded with status 503".to_string()
            },
        }
    }
}

/// Retry policy with no waiting between attempts.
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::fixed(max_attempts, Duration::ZERO)
}

/// Target language named in a translation system prompt.
pub fn target_language(system_prompt: &str) -> String {
    system_prompt
        .rsplit("Target language code:")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Rewrites every string value of the JSON object embedded in `prompt`.
pub fn echo_json<F>(prompt: &str, rewrite: F) -> String
where
    F: Fn(&str) -> String,
{
    let map = parse_strict(prompt).expect("prompt carries a JSON object");
    let rewritten: serde_json::Map<String, serde_json::Value> = map
        .into_iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => (k, serde_json::Value::String(rewrite(&s))),
            other => (k, other),
        })
        .collect();
    serde_json::to_string(&rewritten).unwrap()
}

/// Translation responder that tags every value with the target language.
pub fn tagging_translator(system_prompt: &str, user_prompt: &str) -> Result<String, CallError> {
    let language = target_language(system_prompt);
    Ok(echo_json(user_prompt, |v| format!("[{}] {}", language, v)))
}
