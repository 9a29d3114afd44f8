//! Durable record of the last run.
//!
//! One JSON document, written only by the scheduler:
//!
//! ```json
//! {
//!   "schedule": "0 0 * * *",
//!   "timezone": "UTC",
//!   "runId": "6f1c...",
//!   "lastRun": "2024-01-02T00:00:00Z",
//!   "lastRunFinishedAt": "2024-01-02T00:04:12Z",
//!   "nextRun": "2024-01-03T00:00:00Z",
//!   "lastStatus": { "contentGeneration": { "success": true, ... } },
//!   "isRunning": false
//! }
//! ```

pub mod store;
pub use store::StatusStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::tasks::TaskOutcome;

/// In-memory state of the current or last run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: Option<Uuid>,
    pub last_run_started_at: Option<DateTime<Utc>>,
    /// `None` while a run is in flight.
    pub last_run_finished_at: Option<DateTime<Utc>>,
    pub per_task: BTreeMap<String, TaskOutcome>,
    pub is_running: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedStatus {
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub run_id: Option<Uuid>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_run_finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_status: BTreeMap<String, TaskOutcome>,
    /// Informational only; never trusted on load.
    #[serde(default)]
    pub is_running: bool,
}

impl PersistedStatus {
    pub fn new(
        schedule: &str,
        timezone: &str,
        record: &RunRecord,
        next_run: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            schedule: schedule.to_string(),
            timezone: timezone.to_string(),
            run_id: record.run_id,
            last_run: record.last_run_started_at,
            last_run_finished_at: record.last_run_finished_at,
            next_run,
            last_status: record.per_task.clone(),
            is_running: record.is_running,
        }
    }

    /// A loaded record is never running: no run survives a restart.
    pub fn into_record(self) -> RunRecord {
        RunRecord {
            run_id: self.run_id,
            last_run_started_at: self.last_run,
            last_run_finished_at: self.last_run_finished_at,
            per_task: self.last_status,
            is_running: false,
        }
    }
}
