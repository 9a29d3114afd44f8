//! Central repository for timeouts, limits and default values
//!
//! Constants are grouped by concern so config defaults and runtime code
//! read from a single place.

use std::time::Duration;

/// Remote generation service constants
pub mod http {
    use super::Duration;

    /// Default timeout for a single generation/translation request
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Timeout for establishing HTTP connections
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Timeout for the lightweight `/models` availability probe
    pub const STATUS_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default OpenAI-compatible endpoint
    pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

    /// Environment variable that overrides the configured credential
    pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
}

/// Retry constants
pub mod retry {
    /// Attempts for text and translation calls
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// First backoff delay for text and translation calls
    pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

    /// Ceiling for exponential backoff
    pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

    /// Attempts per banner image
    pub const BANNER_ATTEMPTS: u32 = 3;

    /// Delay between banner image attempts
    pub const BANNER_RETRY_DELAY_MS: u64 = 2_000;
}

/// Scheduler constants
pub mod scheduler {
    /// Daily at midnight
    pub const DEFAULT_SCHEDULE: &str = "0 0 * * *";

    /// Timezone used to evaluate the schedule
    pub const DEFAULT_TIMEZONE: &str = "UTC";

    /// Where the run record is persisted
    pub const DEFAULT_STATUS_FILE: &str = "logs/scheduler-status.json";

    /// Environment variable that overrides the configured schedule
    pub const SCHEDULE_ENV: &str = "UPDATE_SCHEDULE";

    /// Upper bound on how long shutdown waits for an in-flight run
    pub const SHUTDOWN_GRACE_SECONDS: u64 = 120;

    /// Task names, also the keys of `lastStatus` in the status file
    pub const CONTENT_GENERATION: &str = "contentGeneration";
    pub const BANNER_UPDATES: &str = "bannerUpdates";
    pub const LANGUAGE_UPDATES: &str = "languageUpdates";
}

/// Content and translation constants
pub mod content {
    pub const DEFAULT_DIRECTORY: &str = "lang";
    pub const DEFAULT_VERSIONS: u32 = 6;
    pub const DEFAULT_BASE_LANGUAGE: &str = "en";
    pub const DEFAULT_LANGUAGES: [&str; 6] = ["en", "ja", "de", "fr", "ko", "zh"];
}

/// Banner asset constants
pub mod banners {
    pub const DEFAULT_DIRECTORY: &str = "random-banner";
    pub const BACKUP_DIR: &str = "backup";
    pub const IMAGE_EXTENSION: &str = "png";
}

/// Control surface defaults
pub mod server {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 3000;
}
