//! Configuration management for tasksync
//!
//! This module handles loading, parsing, and validation of configuration files.

use crate::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, CONFIG_GENERATED, DATABASE_FILE_NAME, DEFAULT_API_TOKEN_ENV,
    DEFAULT_AUTO_SYNC_INTERVAL_SECS, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, DEFAULT_PROBE_INTERVAL_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_ID, MAX_AUTO_SYNC_INTERVAL_SECS, MAX_PAGE_SIZE,
    MAX_REQUEST_TIMEOUT_SECS,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the REST service (the `/todos` endpoints live under it)
    pub base_url: String,
    /// User the tasks belong to
    pub user_id: u64,
    /// Upper bound for every remote request
    pub request_timeout_secs: u64,
    /// Number of tasks fetched per page
    pub page_size: u64,
    /// Environment variable holding the bearer token
    pub api_token_env: String,
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Interval between background reconciliation attempts
    pub auto_sync_interval_secs: u64,
    /// Actively probe the server for reachability
    pub connectivity_probe_enabled: bool,
    /// Interval between reachability probes
    pub connectivity_probe_interval_secs: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; empty means the platform data directory
    pub database_path: String,
    /// Keep everything in memory (nothing survives the session)
    pub in_memory: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging to a file
    pub enabled: bool,
    /// Minimum level: "error", "warn", "info", "debug" or "trace"
    pub level: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: DEFAULT_USER_ID,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            api_token_env: DEFAULT_API_TOKEN_ENV.to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync_interval_secs: DEFAULT_AUTO_SYNC_INTERVAL_SECS,
            connectivity_probe_enabled: true,
            connectivity_probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn auto_sync_interval(&self) -> Duration {
        Duration::from_secs(self.auto_sync_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity_probe_interval_secs)
    }
}

impl StorageConfig {
    /// Database file to open, falling back to the platform data directory.
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        if !self.database_path.is_empty() {
            return Ok(PathBuf::from(&self.database_path));
        }
        Ok(Config::get_data_dir()?.join(DATABASE_FILE_NAME))
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        log::LevelFilter::from_str(&self.level).map_err(|_| anyhow::anyhow!("Invalid log level '{}'", self.level))
    }
}

impl Config {
    /// Load configuration from file or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file();

        if let Some(path) = config_path {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in order of precedence
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check current directory
        let current_dir_config = PathBuf::from(CONFIG_FILE_NAME);
        if current_dir_config.exists() {
            return Some(current_dir_config);
        }

        // 2. Check XDG config directory
        let xdg_config = dirs::config_dir()?.join(APP_DIR_NAME).join("config.toml");
        xdg_config.exists().then_some(xdg_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.remote.base_url)
            .with_context(|| format!("Invalid base_url '{}'", self.remote.base_url))?;

        if self.remote.request_timeout_secs == 0 || self.remote.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            anyhow::bail!(
                "request_timeout_secs must be between 1 and {}, got {}",
                MAX_REQUEST_TIMEOUT_SECS,
                self.remote.request_timeout_secs
            );
        }

        if self.remote.page_size == 0 || self.remote.page_size > MAX_PAGE_SIZE {
            anyhow::bail!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.remote.page_size
            );
        }

        if self.remote.api_token_env.is_empty() {
            anyhow::bail!("api_token_env cannot be empty");
        }

        if self.sync.auto_sync_interval_secs == 0 || self.sync.auto_sync_interval_secs > MAX_AUTO_SYNC_INTERVAL_SECS {
            anyhow::bail!(
                "auto_sync_interval_secs must be between 1 and {}",
                MAX_AUTO_SYNC_INTERVAL_SECS
            );
        }

        if self.sync.connectivity_probe_enabled && self.sync.connectivity_probe_interval_secs == 0 {
            anyhow::bail!("connectivity_probe_interval_secs cannot be 0 when probing is enabled");
        }

        self.logging.level_filter()?;

        Ok(())
    }

    /// Generate default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let toml_content = toml::to_string_pretty(&config).context("Failed to serialize default config")?;

        // Add header comment
        let header = format!(
            "# tasksync Configuration File\n# Generated on {}\n\n",
            chrono::Local::now().format("%Y-%m-%d")
        );

        let full_content = header + &toml_content;

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(&path, full_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        println!("{}: {}", CONFIG_GENERATED, path.as_ref().display());
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn get_xdg_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
            .map(|dir| dir.join(APP_DIR_NAME))
    }

    /// Get the default config file path
    pub fn get_default_config_path() -> Result<PathBuf> {
        Ok(Self::get_xdg_config_dir()?.join("config.toml"))
    }

    /// Get the directory holding the database and log file
    pub fn get_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
            .map(|dir| dir.join(APP_DIR_NAME))
    }
}
