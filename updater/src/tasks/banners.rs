use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glob::glob;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

use super::{TaskExecutor, TaskOutcome};
use crate::config::{BannerConfig, BannerSpec};
use crate::constants;
use crate::files::write_atomic;
use crate::http::{RemoteService, RetryPolicy};
use crate::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Updated,
    KeptExisting,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotReport {
    pub success: bool,
    pub status: SlotStatus,
    pub variant: u32,
    pub file_name: String,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SlotReport {
    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            json!({ "success": false, "status": "failed", "error": e.to_string() })
        })
    }
}

/// Regenerates one image per banner slot, picking a random variant each run.
pub struct BannerUpdateTask {
    remote: RemoteService,
    config: BannerConfig,
    policy: RetryPolicy,
    rng: Mutex<StdRng>,
}

impl BannerUpdateTask {
    pub fn new(remote: RemoteService, config: BannerConfig) -> Self {
        Self::with_rng(remote, config, StdRng::from_entropy())
    }

    /// Deterministic variant selection.
    pub fn with_seed(remote: RemoteService, config: BannerConfig, seed: u64) -> Self {
        Self::with_rng(remote, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(remote: RemoteService, config: BannerConfig, rng: StdRng) -> Self {
        let policy = RetryPolicy::fixed(
            config.generation_attempts,
            Duration::from_millis(config.retry_delay_ms),
        );
        Self {
            remote,
            config,
            policy,
            rng: Mutex::new(rng),
        }
    }

    fn pick_variant(&self, variants: u32) -> u32 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(1..=variants.max(1))
    }

    async fn update_slot(&self, spec: &BannerSpec, slot: u32) -> SlotReport {
        let variant = self.pick_variant(spec.variants);
        let file_name = banner_file_name(spec, slot, variant);
        let target = self.config.directory.join(&file_name);
        let prompt = prompts::banner_prompt(spec.page_type, variant);

        debug!("Generating {} (variant {}/{})", file_name, variant, spec.variants);

        let generated = self.remote.generate_image_with(&self.policy, &prompt).await;
        let (attempts, failure) = match generated {
            Ok(image) => {
                let backup = self.backup_existing(&target).await;
                match write_atomic(&target, &image.value).await {
                    Ok(()) => {
                        info!("✓ Banner {} updated after {} attempt(s)", file_name, image.attempts);
                        return SlotReport {
                            success: true,
                            status: SlotStatus::Updated,
                            variant,
                            file_name,
                            attempts: image.attempts,
                            backup,
                            error: None,
                        };
                    }
                    Err(e) => (image.attempts, format!("failed to write {}: {}", target.display(), e)),
                }
            }
            Err(e) => (e.attempts, e.to_string()),
        };

        let status = if fs::try_exists(&target).await.unwrap_or(false) {
            warn!("Banner {} not regenerated, keeping existing file: {}", file_name, failure);
            SlotStatus::KeptExisting
        } else {
            error!("✗ Banner {} failed with no existing file: {}", file_name, failure);
            SlotStatus::Failed
        };

        SlotReport {
            success: false,
            status,
            variant,
            file_name,
            attempts,
            backup: None,
            error: Some(failure),
        }
    }

    /// Slot report for a run where the banner directory could not be created.
    fn unwritable_slot(&self, spec: &BannerSpec, slot: u32, reason: &str) -> SlotReport {
        let variant = self.pick_variant(spec.variants);
        SlotReport {
            success: false,
            status: SlotStatus::Failed,
            variant,
            file_name: banner_file_name(spec, slot, variant),
            attempts: 0,
            backup: None,
            error: Some(reason.to_string()),
        }
    }

    /// Best effort: a failed backup only logs.
    async fn backup_existing(&self, target: &Path) -> Option<String> {
        if !fs::try_exists(target).await.unwrap_or(false) {
            return None;
        }

        let backup_dir = self.config.directory.join(constants::banners::BACKUP_DIR);
        let stem = target.file_stem()?.to_string_lossy().into_owned();
        let backup_name = format!(
            "{}.{}.{}",
            stem,
            Utc::now().format("%Y%m%dT%H%M%S%3fZ"),
            constants::banners::IMAGE_EXTENSION
        );
        let backup_path = backup_dir.join(&backup_name);

        let result = async {
            fs::create_dir_all(&backup_dir).await?;
            fs::copy(target, &backup_path).await
        }
        .await;

        match result {
            Ok(_) => Some(backup_name),
            Err(e) => {
                warn!("Could not back up {}: {}", target.display(), e);
                None
            }
        }
    }
}

pub fn banner_file_name(spec: &BannerSpec, slot: u32, variant: u32) -> String {
    format!(
        "{}{}-v{}.{}",
        spec.prefix,
        slot,
        variant,
        constants::banners::IMAGE_EXTENSION
    )
}

#[async_trait]
impl TaskExecutor for BannerUpdateTask {
    fn name(&self) -> &'static str {
        constants::scheduler::BANNER_UPDATES
    }

    #[instrument(skip(self), name = "banner_updates")]
    async fn run(&self) -> Result<TaskOutcome> {
        let directory_error = match fs::create_dir_all(&self.config.directory).await {
            Ok(()) => None,
            Err(e) => {
                let reason = format!("cannot create {}: {}", self.config.directory.display(), e);
                error!("✗ {}", reason);
                Some(reason)
            }
        };

        let mut details = Map::new();
        let (mut updated, mut kept, mut failed) = (0u32, 0u32, 0u32);

        for spec in &self.config.categories {
            for slot in 1..=spec.count {
                let report = match &directory_error {
                    Some(reason) => self.unwritable_slot(spec, slot, reason),
                    None => self.update_slot(spec, slot).await,
                };
                match report.status {
                    SlotStatus::Updated => updated += 1,
                    SlotStatus::KeptExisting => kept += 1,
                    SlotStatus::Failed => failed += 1,
                }
                details.insert(
                    format!("{}-{}", spec.page_type.as_str(), slot),
                    report.to_value(),
                );
            }
        }

        info!(
            "Banner updates finished: {} updated, {} kept existing, {} failed",
            updated, kept, failed
        );
        if let Some(reason) = directory_error {
            details.insert("error".to_string(), Value::String(reason));
        }
        details.insert(
            "summary".to_string(),
            json!({ "updated": updated, "keptExisting": kept, "failed": failed }),
        );

        Ok(TaskOutcome::new(kept == 0 && failed == 0, Value::Object(details)))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerFile {
    pub file: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerInventory {
    pub total_files: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub files: Vec<BannerFile>,
}

/// Lists the banner images currently on disk.
pub async fn inventory(directory: &Path) -> Result<BannerInventory> {
    let pattern = format!(
        "{}/*.{}",
        directory.display(),
        constants::banners::IMAGE_EXTENSION
    );

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => warn!("Error reading banner file: {}", e),
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let metadata = fs::metadata(&path).await?;
        files.push(BannerFile {
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            size: metadata.len(),
        });
    }

    Ok(BannerInventory {
        total_files: files.len(),
        last_update: files.iter().filter_map(|f| f.last_modified).max(),
        files,
    })
}
