pub mod config;
pub mod constants;
pub mod errors;
pub mod files;
pub mod http;
pub mod prompts;
pub mod scheduler;
pub mod status;
pub mod tasks;
pub mod translation;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigManager};
pub use http::{ApiClient, RemoteService, RetryPolicy};
pub use scheduler::{RunSignal, RunSummary, UpdateScheduler};
pub use status::{RunRecord, StatusStore};
pub use tasks::{TaskExecutor, TaskOutcome};
