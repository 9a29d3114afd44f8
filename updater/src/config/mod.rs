pub mod manager;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
pub use manager::ConfigManager;

use crate::constants;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub banners: BannerConfig,
}

fn default_host() -> String {
    constants::server::DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    constants::server::DEFAULT_PORT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scheduler: SchedulerConfig::default(),
            api: ApiConfig::default(),
            content: ContentConfig::default(),
            banners: BannerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 5-field (`min hour day month dow`) or 6-field (with leading seconds) cron
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// IANA timezone the schedule is evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,
    /// Trigger one run right after startup
    #[serde(default)]
    pub run_on_start: bool,
}

fn default_schedule() -> String {
    constants::scheduler::DEFAULT_SCHEDULE.to_string()
}

fn default_timezone() -> String {
    constants::scheduler::DEFAULT_TIMEZONE.to_string()
}

fn default_status_file() -> PathBuf {
    PathBuf::from(constants::scheduler::DEFAULT_STATUS_FILE)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            timezone: default_timezone(),
            status_file: default_status_file(),
            run_on_start: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer credential; `OPENAI_API_KEY` overrides it
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_endpoint() -> String {
    constants::http::DEFAULT_ENDPOINT.to_string()
}

fn default_text_model() -> String {
    "gpt-4".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_request_timeout() -> u64 {
    constants::http::REQUEST_TIMEOUT.as_secs()
}

fn default_connect_timeout() -> u64 {
    constants::http::CONNECT_TIMEOUT.as_secs()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            text_model: default_text_model(),
            image_model: default_image_model(),
            image_size: default_image_size(),
            request_timeout_seconds: default_request_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff")]
    pub backoff: BackoffKind,
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    constants::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_backoff() -> BackoffKind {
    BackoffKind::Exponential
}

fn default_base_delay() -> u64 {
    constants::retry::DEFAULT_BASE_DELAY_MS
}

fn default_max_delay() -> u64 {
    constants::retry::DEFAULT_MAX_DELAY_MS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: default_backoff(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_content_dir")]
    pub directory: PathBuf,
    /// Versions are numbered `1..=versions`
    #[serde(default = "default_versions")]
    pub versions: u32,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_base_language")]
    pub base_language: String,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from(constants::content::DEFAULT_DIRECTORY)
}

fn default_versions() -> u32 {
    constants::content::DEFAULT_VERSIONS
}

fn default_languages() -> Vec<String> {
    constants::content::DEFAULT_LANGUAGES
        .iter()
        .map(|l| l.to_string())
        .collect()
}

fn default_base_language() -> String {
    constants::content::DEFAULT_BASE_LANGUAGE.to_string()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            directory: default_content_dir(),
            versions: default_versions(),
            languages: default_languages(),
            base_language: default_base_language(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Main,
    News,
    History,
    Technology,
    Vision,
    Company,
    Electronics,
    Cnc,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Main => "main",
            PageType::News => "news",
            PageType::History => "history",
            PageType::Technology => "technology",
            PageType::Vision => "vision",
            PageType::Company => "company",
            PageType::Electronics => "electronics",
            PageType::Cnc => "cnc",
        }
    }
}

/// One banner category: `count` slots, each rotating between `variants` images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerSpec {
    pub page_type: PageType,
    pub prefix: String,
    pub count: u32,
    pub variants: u32,
}

impl BannerSpec {
    fn new(page_type: PageType, prefix: &str, count: u32, variants: u32) -> Self {
        Self {
            page_type,
            prefix: prefix.to_string(),
            count,
            variants,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerConfig {
    #[serde(default = "default_banner_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_generation_attempts")]
    pub generation_attempts: u32,
    #[serde(default = "default_banner_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_categories")]
    pub categories: Vec<BannerSpec>,
}

fn default_banner_dir() -> PathBuf {
    PathBuf::from(constants::banners::DEFAULT_DIRECTORY)
}

fn default_generation_attempts() -> u32 {
    constants::retry::BANNER_ATTEMPTS
}

fn default_banner_retry_delay() -> u64 {
    constants::retry::BANNER_RETRY_DELAY_MS
}

pub fn default_categories() -> Vec<BannerSpec> {
    vec![
        BannerSpec::new(PageType::Main, "index-hero-", 3, 4),
        BannerSpec::new(PageType::News, "news-hero-", 1, 4),
        BannerSpec::new(PageType::History, "history-hero-", 1, 4),
        BannerSpec::new(PageType::Technology, "technology-hero-", 1, 5),
        BannerSpec::new(PageType::Vision, "vision-card-", 4, 5),
        BannerSpec::new(PageType::Company, "company-overview-", 3, 4),
        BannerSpec::new(PageType::Electronics, "electronics-", 1, 4),
        BannerSpec::new(PageType::Cnc, "cnc-", 1, 4),
    ]
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            directory: default_banner_dir(),
            generation_attempts: default_generation_attempts(),
            retry_delay_ms: default_banner_retry_delay(),
            categories: default_categories(),
        }
    }
}
