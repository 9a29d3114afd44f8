use super::Config;
use crate::constants;
use crate::errors::ConfigError;
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/main.toml", config_dir);

        let mut config = if Path::new(&main_config_path).exists() {
            let content = fs::read_to_string(&main_config_path)
                .await
                .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path, e))?;
            Self::parse(&content)?
        } else {
            warn!(
                "Config file {} not found, falling back to built-in defaults",
                main_config_path
            );
            Config::default()
        };

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Self::validate(&config)?;

        info!(
            "Configuration loaded: schedule '{}' ({}), {} content versions x {} languages, {} banner categories",
            config.scheduler.schedule,
            config.scheduler.timezone,
            config.content.versions,
            config.content.languages.len(),
            config.banners.categories.len()
        );

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|e| anyhow!("Failed to parse main config: {}", e))
    }

    /// Environment wins over the file for the credential and the schedule.
    pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(constants::http::API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            debug!("Using API key from {}", constants::http::API_KEY_ENV);
            config.api.api_key = Some(key);
        }

        if let Some(schedule) =
            lookup(constants::scheduler::SCHEDULE_ENV).filter(|s| !s.trim().is_empty())
        {
            info!(
                "Schedule overridden by {}: '{}'",
                constants::scheduler::SCHEDULE_ENV,
                schedule
            );
            config.scheduler.schedule = schedule;
        }
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.content.versions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "content.versions".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if !config
            .content
            .languages
            .iter()
            .any(|l| l == &config.content.base_language)
        {
            return Err(ConfigError::InvalidValue {
                field: "content.languages".to_string(),
                reason: format!(
                    "base language '{}' is not in the supported list",
                    config.content.base_language
                ),
            });
        }

        if config.api.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.retry.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if config.banners.generation_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "banners.generation_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        for spec in &config.banners.categories {
            if spec.count == 0 || spec.variants == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("banners.categories.{}", spec.page_type.as_str()),
                    reason: "count and variants must be at least 1".to_string(),
                });
            }
        }

        config
            .scheduler
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "scheduler.timezone".to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }
}

impl Config {
    /// The credential is mandatory for every remote task.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                field: format!("api.api_key (or {})", constants::http::API_KEY_ENV),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackoffKind, PageType};

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = ConfigManager::parse("").unwrap();
        assert_eq!(config.scheduler.schedule, "0 0 * * *");
        assert_eq!(config.content.versions, 6);
        assert_eq!(config.banners.categories.len(), 8);
        assert_eq!(config.api.retry.backoff, BackoffKind::Exponential);
        assert!(ConfigManager::validate(&config).is_ok());
    }

    #[test]
    fn test_env_overrides_key_and_schedule() {
        let mut config = Config::default();
        ConfigManager::apply_env_overrides(&mut config, |key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "UPDATE_SCHEDULE" => Some("*/5 * * * *".to_string()),
            _ => None,
        });
        assert_eq!(config.api.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.scheduler.schedule, "*/5 * * * *");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.api.api_key = Some("from-file".to_string());
        ConfigManager::apply_env_overrides(&mut config, |_| Some("  ".to_string()));
        assert_eq!(config.api.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.scheduler.schedule, "0 0 * * *");
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        let config = Config::default();
        let err = config.require_api_key().unwrap_err();
        assert!(err.to_string().contains("api.api_key"));
    }

    #[test]
    fn test_rejects_base_language_outside_list() {
        let mut config = Config::default();
        config.content.base_language = "it".to_string();
        assert!(ConfigManager::validate(&config).is_err());
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let mut config = Config::default();
        config.scheduler.timezone = "Mars/Olympus".to_string();
        let err = ConfigManager::validate(&config).unwrap_err();
        assert!(err.to_string().contains("scheduler.timezone"));
    }

    #[test]
    fn test_banner_categories_from_toml() {
        let config = ConfigManager::parse(
            r#"
[banners]
directory = "/srv/site/random-banner"

[[banners.categories]]
page_type = "cnc"
prefix = "cnc-"
count = 2
variants = 3
"#,
        )
        .unwrap();
        assert_eq!(config.banners.categories.len(), 1);
        assert_eq!(config.banners.categories[0].page_type, PageType::Cnc);
        assert_eq!(config.banners.generation_attempts, 3);
    }
}
