//! Configuration management for entryprep.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for entryprep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Processing options (resize, metadata, sequencing)
    pub processing: ProcessingConfig,

    /// HTTP fetch settings
    pub fetch: FetchConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Pipeline settings
    pub pipeline: PipelineConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.entryprep.entryprep/config.toml
    /// - Linux: ~/.config/entryprep/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\entryprep\config\config.toml
    ///
    /// Falls back to ~/.entryprep/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "entryprep", "entryprep")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".entryprep").join("config.toml")
            })
    }

    /// Parent directory for run folders, with `~` expanded.
    ///
    /// Falls back to the directory containing the input table.
    pub fn output_parent(&self, input: &Path) -> PathBuf {
        match &self.output.default_dir {
            Some(dir) => {
                let path_str = dir.to_string_lossy();
                PathBuf::from(shellexpand::tilde(&path_str).into_owned())
            }
            None => input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Run-specific output root: `<parent>/<input table file stem>`.
pub fn run_output_root(parent: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entries".to_string());
    parent.join(stem)
}
