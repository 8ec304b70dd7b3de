use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default USFM source: unfoldingWord Hebrew Bible, one file per book.
pub const DEFAULT_BASE_URL: &str = "https://git.door43.org/unfoldingWord/hbo_uhb/raw/branch/master/";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

/// SQLite store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
}

/// Remote USFM source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl SourceConfig {
    /// Per-request HTTP timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            extension: default_extension(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

/// Import run tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Pause after each book so the remote host is not hit in a tight loop
    #[serde(default = "default_book_delay_ms")]
    pub book_delay_ms: u64,
    /// Books in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            book_delay_ms: default_book_delay_ms(),
            concurrency: default_concurrency(),
            log_level: default_log_level(),
        }
    }
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_extension() -> String {
    ".usfm".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_book_delay_ms() -> u64 {
    500
}

fn default_concurrency() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in TANAKH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("TANAKH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_file(&config_path)
    }

    /// Load and validate a specific config file
    pub fn from_file(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Build a config with defaults for everything except the database path
    pub fn default_with_db<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            store: StoreConfig {
                db_path: db_path.as_ref().to_path_buf(),
                migrations_dir: default_migrations_dir(),
            },
            source: SourceConfig::default(),
            import: ImportConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.source.base_url)
            .with_context(|| format!("source.base_url is not a valid URL: {}", self.source.base_url))?;

        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("source.base_url must use http or https, got {}", base.scheme());
        }

        if !self.source.base_url.ends_with('/') {
            anyhow::bail!(
                "source.base_url must end with '/': {}",
                self.source.base_url
            );
        }

        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be greater than 0");
        }

        if self.import.concurrency == 0 {
            anyhow::bail!("import.concurrency must be at least 1");
        }

        if self.store.db_path.as_os_str().is_empty() {
            anyhow::bail!("store.db_path must not be empty");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.store.db_path
    }

    /// Get migrations directory
    pub fn migrations_dir(&self) -> &Path {
        &self.store.migrations_dir
    }

    pub fn book_delay(&self) -> Duration {
        Duration::from_millis(self.import.book_delay_ms)
    }
}
