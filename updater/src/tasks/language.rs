use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use tracing::{error, info, instrument};

use super::{TaskExecutor, TaskOutcome};
use crate::config::ContentConfig;
use crate::constants;
use crate::files::{read_content_map, version_path, write_content_map};
use crate::translation::{ContentMap, Translator};

/// Translates every version from the base language into the other
/// supported languages. A language that fails keeps its previous file.
pub struct LanguageUpdateTask {
    translator: Translator,
    config: ContentConfig,
}

impl LanguageUpdateTask {
    pub fn new(translator: Translator, config: ContentConfig) -> Self {
        Self { translator, config }
    }

    fn target_languages(&self) -> Vec<&str> {
        self.config
            .languages
            .iter()
            .map(|l| l.as_str())
            .filter(|l| *l != self.config.base_language)
            .collect()
    }

    async fn translate_one(&self, source: &ContentMap, version: u32, language: &str) -> Result<()> {
        let translated = self.translator.translate_map(source, language).await?;
        let path = version_path(&self.config.directory, language, version);
        write_content_map(&path, &translated).await
    }

    async fn update_version(&self, version: u32) -> Value {
        let source_path = version_path(&self.config.directory, &self.config.base_language, version);
        let source = match read_content_map(&source_path).await {
            Ok(source) => source,
            Err(e) => {
                error!("✗ Version {}: cannot read source: {:#}", version, e);
                return json!({ "success": false, "error": format!("{:#}", e) });
            }
        };

        let targets = self.target_languages();
        let results = join_all(targets.iter().map(|language| {
            let source = &source;
            async move { (*language, self.translate_one(source, version, language).await) }
        }))
        .await;

        let mut languages = Map::new();
        let mut version_ok = true;
        for (language, result) in results {
            match result {
                Ok(()) => {
                    info!("✓ Version {} translated to {}", version, language);
                    languages.insert(language.to_string(), json!({ "success": true }));
                }
                Err(e) => {
                    error!("✗ Version {} translation to {} failed: {:#}", version, language, e);
                    version_ok = false;
                    languages.insert(
                        language.to_string(),
                        json!({ "success": false, "error": format!("{:#}", e) }),
                    );
                }
            }
        }

        json!({ "success": version_ok, "languages": languages })
    }
}

#[async_trait]
impl TaskExecutor for LanguageUpdateTask {
    fn name(&self) -> &'static str {
        constants::scheduler::LANGUAGE_UPDATES
    }

    #[instrument(skip(self), name = "language_updates")]
    async fn run(&self) -> Result<TaskOutcome> {
        let mut details = Map::new();
        let mut all_succeeded = true;

        for version in 1..=self.config.versions {
            let report = self.update_version(version).await;
            if report["success"] != Value::Bool(true) {
                all_succeeded = false;
            }
            details.insert(format!("version-{}", version), report);
        }

        Ok(TaskOutcome::new(all_succeeded, Value::Object(details)))
    }
}
