//! Temporary content/banner/status layout with a matching `Config`

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use updater::config::{BannerConfig, BannerSpec, Config, ContentConfig, PageType, SchedulerConfig};

pub struct TestWorkspace {
    pub temp_dir: TempDir,
    pub config: Config,
}

impl TestWorkspace {
    /// Two content versions in en/de/fr and a single one-variant banner slot.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();

        let config = Config {
            scheduler: SchedulerConfig {
                schedule: "0 0 * * *".to_string(),
                timezone: "UTC".to_string(),
                status_file: root.join("logs/scheduler-status.json"),
                run_on_start: false,
            },
            content: ContentConfig {
                directory: root.join("lang"),
                versions: 2,
                languages: vec!["en".to_string(), "de".to_string(), "fr".to_string()],
                base_language: "en".to_string(),
            },
            banners: BannerConfig {
                directory: root.join("random-banner"),
                generation_attempts: 3,
                retry_delay_ms: 10,
                categories: vec![banner_spec(PageType::Main, "index-hero-", 1, 1)],
            },
            ..Config::default()
        };

        let workspace = Self { temp_dir, config };
        for version in 1..=2 {
            workspace.write_content("en", version, &sample_content(version));
        }
        workspace
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn content_path(&self, language: &str, version: u32) -> PathBuf {
        self.config
            .content
            .directory
            .join(language)
            .join(format!("version-{}.json", version))
    }

    pub fn write_content(&self, language: &str, version: u32, content: &Value) {
        let path = self.content_path(language, version);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_string_pretty(content).unwrap()).unwrap();
    }

    pub fn read_content(&self, language: &str, version: u32) -> Value {
        let raw = fs::read_to_string(self.content_path(language, version)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    pub fn banner_path(&self, file_name: &str) -> PathBuf {
        self.config.banners.directory.join(file_name)
    }

    pub fn write_banner(&self, file_name: &str, bytes: &[u8]) {
        fs::create_dir_all(&self.config.banners.directory).unwrap();
        fs::write(self.banner_path(file_name), bytes).unwrap();
    }

    pub fn status_file(&self) -> &Path {
        &self.config.scheduler.status_file
    }

    pub fn read_status(&self) -> Value {
        let raw = fs::read_to_string(self.status_file()).expect("status file written");
        serde_json::from_str(&raw).unwrap()
    }
}

pub fn banner_spec(page_type: PageType, prefix: &str, count: u32, variants: u32) -> BannerSpec {
    BannerSpec {
        page_type,
        prefix: prefix.to_string(),
        count,
        variants,
    }
}

pub fn sample_content(version: u32) -> Value {
    json!({
        "hero.title": format!("Precision parts, version {}", version),
        "hero.subtitle": "Built by <strong>Human Plus</strong> for every line",
        "footer.note": "Line one<br/>Line two",
    })
}
