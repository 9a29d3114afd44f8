//! Translation pipeline
//!
//! ```text
//! source map → markup::encode → RemoteService::translate_text
//!            → validator::parse_strict → markup::decode → key check
//! ```

pub mod markup;
pub mod validator;

pub use validator::{parse_strict, RepairStep};

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::http::RemoteService;

/// A flat key → text map as stored in the language files.
pub type ContentMap = Map<String, Value>;

/// Encodes markup in every string value.
pub fn encode_map(source: &ContentMap) -> ContentMap {
    source
        .iter()
        .map(|(key, value)| (key.clone(), map_string(value, markup::encode)))
        .collect()
}

pub fn decode_map(source: &ContentMap) -> ContentMap {
    source
        .iter()
        .map(|(key, value)| (key.clone(), map_string(value, markup::decode)))
        .collect()
}

fn map_string(value: &Value, f: fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other.clone(),
    }
}

/// Keeps exactly the keys of `source`; fails if any of them is missing.
pub fn conform_to_source(source: &ContentMap, mut produced: ContentMap) -> Result<ContentMap> {
    let missing: Vec<&str> = source
        .keys()
        .filter(|k| !produced.contains_key(*k))
        .map(|k| k.as_str())
        .collect();

    if !missing.is_empty() {
        return Err(anyhow!("response is missing keys: {}", missing.join(", ")));
    }

    let extra = produced.len() - source.len();
    if extra > 0 {
        debug!("Dropping {} unexpected key(s) from response", extra);
    }

    Ok(source
        .keys()
        .filter_map(|k| produced.remove(k).map(|v| (k.clone(), v)))
        .collect())
}

/// Turns a raw model response into a map with the same keys as `source`.
pub fn accept_response(source: &ContentMap, raw: &str) -> Result<ContentMap> {
    let parsed = parse_strict(raw)?;
    conform_to_source(source, decode_map(&parsed))
}

pub struct Translator {
    remote: RemoteService,
}

impl Translator {
    pub fn new(remote: RemoteService) -> Self {
        Self { remote }
    }

    pub async fn translate_map(
        &self,
        source: &ContentMap,
        target_language: &str,
    ) -> Result<ContentMap> {
        let payload = serde_json::to_string_pretty(&encode_map(source))
            .context("failed to serialize source content")?;

        let response = self.remote.translate_text(&payload, target_language).await?;
        if response.attempts > 1 {
            warn!(
                "Translation to {} needed {} attempts",
                target_language, response.attempts
            );
        }

        accept_response(source, &response.value)
            .with_context(|| format!("invalid translation for {}", target_language))
    }
}
