//! Error types for the updater
//!
//! Task executors never let these escape: they are folded into a failed
//! `TaskOutcome`. Only schedule configuration errors reach callers of the
//! scheduler, and `UpdaterError` is what the binary fails with at startup.

use std::fmt;

/// Startup error for the updater binary
#[derive(Debug)]
pub enum UpdaterError {
    /// Configuration-related errors
    Config(ConfigError),

    /// Schedule expression or timer errors
    Schedule(ScheduleError),

    /// Other errors with context
    Other(String),
}

/// Configuration error variants
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to load configuration file
    LoadFailed { path: String, reason: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },

    /// Missing required configuration
    MissingRequired { field: String },
}

/// Schedule error variants
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// Expression could not be parsed or never fires
    Invalid { expression: String, reason: String },

    /// The timer engine could not be created or armed
    TimerUnavailable { reason: String },
}

/// A remote call that failed for good, either because the failure was
/// permanent or because the retry budget ran out.
#[derive(Debug, Clone)]
pub struct RemoteServiceError {
    pub operation: String,
    pub attempts: u32,
    pub last_cause: String,
    pub transient: bool,
}

/// Translation output that stayed unparseable after the repair pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationFormatError {
    pub reason: String,
    pub excerpt: String,
}

/// A run was requested while another one holds the run guard.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInProgress {
    pub run_id: Option<uuid::Uuid>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Status store error variants
#[derive(Debug)]
pub enum PersistenceError {
    /// Reading the status file failed
    ReadFailed { path: String, reason: String },

    /// Writing the status file failed
    WriteFailed { path: String, reason: String },

    /// The status file exists but is not valid
    Corrupt { path: String, reason: String },
}

impl fmt::Display for UpdaterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdaterError::Config(e) => write!(f, "Configuration error: {}", e),
            UpdaterError::Schedule(e) => write!(f, "Schedule error: {}", e),
            UpdaterError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path, reason)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            ConfigError::MissingRequired { field } => {
                write!(f, "Missing required field: {}", field)
            }
        }
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Invalid { expression, reason } => {
                write!(f, "Invalid schedule '{}': {}", expression, reason)
            }
            ScheduleError::TimerUnavailable { reason } => {
                write!(f, "Timer unavailable: {}", reason)
            }
        }
    }
}

impl fmt::Display for RemoteServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.transient { "transient" } else { "permanent" };
        write!(
            f,
            "{} failed after {} attempt(s) ({}): {}",
            self.operation, self.attempts, kind, self.last_cause
        )
    }
}

impl fmt::Display for TranslationFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (near: {:?})", self.reason, self.excerpt)
    }
}

impl fmt::Display for RunInProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.run_id, self.started_at) {
            (Some(id), Some(at)) => write!(f, "Run {} already in progress since {}", id, at),
            _ => write!(f, "A run is already in progress"),
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::ReadFailed { path, reason } => {
                write!(f, "Failed to read '{}': {}", path, reason)
            }
            PersistenceError::WriteFailed { path, reason } => {
                write!(f, "Failed to write '{}': {}", path, reason)
            }
            PersistenceError::Corrupt { path, reason } => {
                write!(f, "Status file '{}' is corrupt: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for UpdaterError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for ScheduleError {}
impl std::error::Error for RemoteServiceError {}
impl std::error::Error for TranslationFormatError {}
impl std::error::Error for RunInProgress {}
impl std::error::Error for PersistenceError {}

impl From<anyhow::Error> for UpdaterError {
    fn from(err: anyhow::Error) -> Self {
        UpdaterError::Other(err.to_string())
    }
}

impl From<ConfigError> for UpdaterError {
    fn from(err: ConfigError) -> Self {
        UpdaterError::Config(err)
    }
}

impl From<ScheduleError> for UpdaterError {
    fn from(err: ScheduleError) -> Self {
        UpdaterError::Schedule(err)
    }
}
