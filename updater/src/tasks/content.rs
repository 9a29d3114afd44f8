use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{error, info, instrument, warn};

use super::{TaskExecutor, TaskOutcome};
use crate::config::ContentConfig;
use crate::constants;
use crate::files::{read_content_map, version_path, write_content_map};
use crate::http::RemoteService;
use crate::prompts;
use crate::translation::{accept_response, encode_map};

/// Regenerates the base-language copy of every content version.
pub struct ContentGenerationTask {
    remote: RemoteService,
    config: ContentConfig,
}

impl ContentGenerationTask {
    pub fn new(remote: RemoteService, config: ContentConfig) -> Self {
        Self { remote, config }
    }

    async fn regenerate_version(&self, version: u32) -> Result<usize> {
        let path = version_path(&self.config.directory, &self.config.base_language, version);
        let source = read_content_map(&path).await?;
        if source.is_empty() {
            bail!("{} has no keys", path.display());
        }

        let payload = serde_json::to_string_pretty(&encode_map(&source))
            .context("failed to serialize source content")?;
        let response = self
            .remote
            .generate_text(&prompts::content_prompt(version, &payload))
            .await?;

        let regenerated = accept_response(&source, &response.value)
            .with_context(|| format!("invalid generated content for version {}", version))?;
        write_content_map(&path, &regenerated).await?;

        Ok(regenerated.len())
    }
}

#[async_trait]
impl TaskExecutor for ContentGenerationTask {
    fn name(&self) -> &'static str {
        constants::scheduler::CONTENT_GENERATION
    }

    #[instrument(skip(self), name = "content_generation")]
    async fn run(&self) -> Result<TaskOutcome> {
        let api = self.remote.check_status().await;
        if !api.available {
            warn!("Skipping content generation, API unavailable: {}", api.message);
            return Ok(TaskOutcome::new(
                false,
                json!({ "error": "API service unavailable", "apiStatus": api }),
            ));
        }

        let mut details = Map::new();
        let mut all_succeeded = true;

        for version in 1..=self.config.versions {
            let key = format!("version-{}", version);
            match self.regenerate_version(version).await {
                Ok(keys) => {
                    info!("✓ Content version {} regenerated ({} keys)", version, keys);
                    details.insert(key, json!({ "success": true, "keys": keys }));
                }
                Err(e) => {
                    error!("✗ Content version {} failed: {:#}", version, e);
                    all_succeeded = false;
                    details.insert(key, json!({ "success": false, "error": format!("{:#}", e) }));
                }
            }
        }

        Ok(TaskOutcome::new(all_succeeded, Value::Object(details)))
    }
}
