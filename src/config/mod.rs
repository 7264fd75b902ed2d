//! Configuration for the aggregator.
//!
//! Read once at startup from `~/.config/estuary/config.toml` (or an explicit
//! path). Unlike optional UI settings, the source list is mandatory: a
//! missing or invalid file is fatal.

pub mod interval;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub use interval::{format_interval, parse_interval};

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// Source groups, in display order.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub feeds: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fetch worker pool size (default: available parallelism - 1)
    pub concurrency: Option<usize>,

    /// Pause between the end of one fetch cycle and the start of the next
    #[serde(deserialize_with = "interval::deserialize")]
    pub update_interval: Duration,

    /// Pause between cleanup runs
    #[serde(deserialize_with = "interval::deserialize")]
    pub cleanup_interval: Duration,

    /// Items older than this many days (by ingestion time) are removed
    pub retention_days: u32,

    /// Optional cap on the total number of stored items
    pub retention_items: Option<usize>,

    /// Upper bound on a single source fetch
    #[serde(deserialize_with = "interval::deserialize")]
    pub fetch_timeout: Duration,

    pub default_page_size: usize,
    pub max_page_size: usize,

    pub storage: StorageKind,

    /// SQLite database path (default: `<data dir>/estuary/estuary.db`)
    pub database: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: None,
            update_interval: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(3600),
            retention_days: 7,
            retention_items: None,
            fetch_timeout: Duration::from_secs(10),
            default_page_size: 100,
            max_page_size: 500,
            storage: StorageKind::Sqlite,
            database: None,
        }
    }
}

impl Settings {
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(default_concurrency)
    }
}

/// One worker per core, leaving a core for the query side.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

impl Config {
    /// Load configuration from `path`, or the default path when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the settings.
    ///
    /// Supported environment variables (empty values are ignored):
    /// - `ESTUARY_CONCURRENCY`
    /// - `ESTUARY_UPDATE_INTERVAL`, `ESTUARY_CLEANUP_INTERVAL`, `ESTUARY_FETCH_TIMEOUT`
    ///   (interval syntax, e.g. `90s`, `5m`, or raw seconds)
    /// - `ESTUARY_RETENTION_DAYS`
    /// - `ESTUARY_RETENTION_ITEMS`
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let settings = &mut self.settings;

        if let Some(value) = get("ESTUARY_CONCURRENCY") {
            settings.concurrency = Some(parse_number("ESTUARY_CONCURRENCY", &value)?);
        }
        if let Some(value) = get("ESTUARY_UPDATE_INTERVAL") {
            settings.update_interval = parse_env_interval("ESTUARY_UPDATE_INTERVAL", &value)?;
        }
        if let Some(value) = get("ESTUARY_CLEANUP_INTERVAL") {
            settings.cleanup_interval = parse_env_interval("ESTUARY_CLEANUP_INTERVAL", &value)?;
        }
        if let Some(value) = get("ESTUARY_FETCH_TIMEOUT") {
            settings.fetch_timeout = parse_env_interval("ESTUARY_FETCH_TIMEOUT", &value)?;
        }
        if let Some(value) = get("ESTUARY_RETENTION_DAYS") {
            settings.retention_days = parse_number("ESTUARY_RETENTION_DAYS", &value)?;
        }
        if let Some(value) = get("ESTUARY_RETENTION_ITEMS") {
            settings.retention_items = Some(parse_number("ESTUARY_RETENTION_ITEMS", &value)?);
        }

        Ok(())
    }

    /// Parse and validate configuration held in memory.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/estuary/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("estuary").join("config.toml"))
    }

    /// Resolve the database path, creating its parent directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        let path = match self.settings.database {
            Some(ref p) => p.clone(),
            None => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("estuary")
                .join("estuary.db"),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = &self.settings;

        if settings.concurrency == Some(0) {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        for (name, value) in [
            ("update_interval", settings.update_interval),
            ("cleanup_interval", settings.cleanup_interval),
            ("fetch_timeout", settings.fetch_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{} must be non-zero", name)));
            }
        }
        if settings.retention_days == 0 {
            return Err(ConfigError::Invalid("retention_days must be at least 1".into()));
        }
        if settings.retention_items == Some(0) {
            return Err(ConfigError::Invalid("retention_items must be at least 1".into()));
        }
        if settings.default_page_size == 0 || settings.default_page_size > settings.max_page_size
        {
            return Err(ConfigError::Invalid(format!(
                "default_page_size must be between 1 and max_page_size ({})",
                settings.max_page_size
            )));
        }

        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(ConfigError::Invalid("group name must not be empty".into()));
            }
            for feed in &group.feeds {
                validate_source_url(feed)?;
            }
        }

        if self.groups.iter().all(|g| g.feeds.is_empty()) {
            return Err(ConfigError::Invalid("no sources configured".into()));
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} is not a valid number: {}", key, value)))
}

fn parse_env_interval(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_interval(value).map_err(|e| ConfigError::Invalid(format!("{}: {}", key, e)))
}

fn validate_source_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ConfigError::Invalid(format!("invalid source URL {}: {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::Invalid(format!(
            "unsupported URL scheme {} in {}",
            scheme, raw
        ))),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
