//! Configuration types for the lyricist host.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LyricsError, Result};

/// Top-level configuration for the host process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricistConfig {
    /// Renderer bridge settings.
    pub host: HostConfig,
    /// Diagnostic logging settings.
    pub logging: LoggingConfig,
    /// File storage backend settings.
    pub storage: StorageConfig,
}

/// Renderer bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Capacity of the queue between the stdin reader and the dispatcher.
    pub inbound_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 64,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Show OS file pickers. When false the host runs headless: nothing can
    /// be picked for opening and new documents are saved into
    /// `save_directory`.
    pub native_dialogs: bool,
    /// Directory for headless saves (None = the user's documents folder).
    pub save_directory: Option<PathBuf>,
}

impl LyricistConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| LyricsError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LyricsError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default location, or return defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default() -> Self {
        let path = Self::default_config_path();
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(LyricsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config; using defaults");
                Self::default()
            }
        }
    }

    /// Returns the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_file()
    }

    /// Directory that headless saves land in.
    #[must_use]
    pub fn effective_save_directory(&self) -> PathBuf {
        self.storage
            .save_directory
            .clone()
            .unwrap_or_else(crate::app_dirs::documents_dir)
    }
}
