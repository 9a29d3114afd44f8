//! Task executors run by the scheduler.
//!
//! Each executor does a bounded amount of remote work and reports a
//! [`TaskOutcome`]. Per-item failures, including filesystem errors, are
//! folded into `details` by the executor itself. An `Err` or panic that
//! still comes out of [`TaskExecutor::run`] is turned into a failed outcome
//! by the scheduler.

pub mod banners;
pub mod content;
pub mod language;

pub use banners::{BannerInventory, BannerUpdateTask};
pub use content::ContentGenerationTask;
pub use language::LanguageUpdateTask;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::http::RemoteService;
use crate::translation::Translator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Value,
}

impl TaskOutcome {
    pub fn new(success: bool, details: Value) -> Self {
        Self {
            success,
            timestamp: Utc::now(),
            details,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::new(false, json!({ "error": error.to_string() }))
    }
}

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Key under which the outcome is recorded.
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<TaskOutcome>;
}

/// Content generation, banner updates, language updates, in that order.
pub fn standard_executors(config: &Config, remote: RemoteService) -> Vec<Arc<dyn TaskExecutor>> {
    vec![
        Arc::new(ContentGenerationTask::new(
            remote.clone(),
            config.content.clone(),
        )),
        Arc::new(BannerUpdateTask::new(remote.clone(), config.banners.clone())),
        Arc::new(LanguageUpdateTask::new(
            Translator::new(remote),
            config.content.clone(),
        )),
    ]
}
