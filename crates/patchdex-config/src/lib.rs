#![deny(unsafe_code)]

//! Configuration loading and validation for patchdex.
//!
//! Loads TOML configuration files and validates them. Provides the
//! [`AppConfig`] type as the central configuration structure consumed by the
//! indexer, the rebuild scheduler and the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Package discovery and output settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Rebuild scheduling settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where packages are discovered and where the index is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory whose subfolders are scanned for content packages.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Path of the generated index document.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Optional JSON array of qualified identifiers that must never be
    /// re-emitted (vanilla and otherwise known items).
    #[serde(default)]
    pub baseline_path: Option<PathBuf>,

    /// Maximum folder depth below `root_dir` searched for manifests.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            output_path: default_output_path(),
            baseline_path: None,
            max_depth: default_max_depth(),
        }
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("Mods")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("patchdex/installed-items.json")
}

fn default_max_depth() -> usize {
    4
}

/// Rebuild scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Automatic rebuild requests arriving within this many milliseconds of
    /// the previous automatic run's start are dropped.
    #[serde(default = "default_auto_cooldown_ms")]
    pub auto_cooldown_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            auto_cooldown_ms: default_auto_cooldown_ms(),
        }
    }
}

fn default_auto_cooldown_ms() -> u64 {
    2000
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut config = Self::parse(&content)?;
        config.resolve_relative_to(path.parent().unwrap_or(Path::new("")));
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "index.root_dir must not be empty".to_string(),
            ));
        }
        if self.index.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "index.output_path must not be empty".to_string(),
            ));
        }
        if self.index.max_depth == 0 {
            return Err(ConfigError::Validation(
                "index.max_depth must be at least 1".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }

    /// Rebase relative paths onto the directory holding the config file.
    fn resolve_relative_to(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.index.root_dir);
        rebase(&mut self.index.output_path);
        if let Some(baseline) = self.index.baseline_path.as_mut() {
            rebase(baseline);
        }
    }
}
