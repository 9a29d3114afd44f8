//! Scheduled update orchestrator
//!
//! Decides when to run, runs the fixed task set, and records what happened.
//!
//! # Run lifecycle
//!
//! ```text
//! timer fire / trigger_run / run_updates
//!        ↓
//!   claim run guard ──(held)──→ Skipped / RunInProgress
//!        ↓
//!   contentGeneration → bannerUpdates → languageUpdates
//!   (each task isolated: Err or panic becomes a failed outcome)
//!        ↓
//!   recompute next run → persist status → release guard
//! ```
//!
//! # Timer
//!
//! The `cron` crate computes fire instants in the configured timezone and a
//! one-shot `tokio-cron-scheduler` job is armed for exactly that instant.
//! After each fire the job is re-armed for the following instant, so the
//! exposed `nextRun` is always the instant the timer will fire at.
//!
//! # Configuration
//!
//! ```toml
//! [scheduler]
//! schedule = "0 0 * * *"   # 5-field (min hour day month dow) or 6-field with seconds
//! timezone = "Asia/Seoul"
//! status_file = "logs/scheduler-status.json"
//! run_on_start = false
//! ```

pub mod orchestrator;
pub mod schedule;

pub use orchestrator::UpdateScheduler;
pub use schedule::Schedule;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::tasks::TaskOutcome;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: BTreeMap<String, TaskOutcome>,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn message(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

#[derive(Debug, Clone)]
pub enum RunSignal {
    /// Another run held the guard; nothing was executed.
    Skipped,
    Completed(RunSummary),
}

/// A run started in the background by `trigger_run`.
#[derive(Debug)]
pub struct RunHandle {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub join: JoinHandle<RunSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Elapsed {
    pub milliseconds: i64,
    pub formatted: String,
}

impl Elapsed {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self::from_millis((to - from).num_milliseconds())
    }

    pub fn from_millis(milliseconds: i64) -> Self {
        let total_seconds = milliseconds.max(0) / 1000;
        Self {
            milliseconds,
            formatted: format!(
                "{}h {}m {}s",
                total_seconds / 3600,
                (total_seconds % 3600) / 60,
                total_seconds % 60
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub schedule: String,
    pub timezone: String,
    /// Whether the timer is armed.
    pub active: bool,
    pub is_running: bool,
    pub run_id: Option<Uuid>,
    pub last_run: Option<DateTime<Utc>>,
    pub last_run_finished_at: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub time_until_next_run: Option<Elapsed>,
    pub time_since_last_run: Option<Elapsed>,
    pub last_status: BTreeMap<String, TaskOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_formatting() {
        assert_eq!(Elapsed::from_millis(0).formatted, "0h 0m 0s");
        assert_eq!(Elapsed::from_millis(3_723_999).formatted, "1h 2m 3s");
        assert_eq!(Elapsed::from_millis(90_000_000).formatted, "25h 0m 0s");
    }

    #[test]
    fn test_negative_durations_clamp() {
        let elapsed = Elapsed::from_millis(-5_000);
        assert_eq!(elapsed.formatted, "0h 0m 0s");
        assert_eq!(elapsed.milliseconds, -5_000);
    }
}
