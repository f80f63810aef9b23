//! Centralized directory paths for the lyricist host.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/lyricist/` | `~/.local/share/lyricist/` |
//! | Config | `~/Library/Application Support/lyricist/` | `~/.config/lyricist/` |
//!
//! # Environment Overrides
//!
//! - `LYRICIST_DATA_DIR` overrides [`data_dir`]
//! - `LYRICIST_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the recent-files list. Resolves to `dirs::data_dir()/lyricist/`
/// unless `LYRICIST_DATA_DIR` is set.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("LYRICIST_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("lyricist"))
        .unwrap_or_else(|| PathBuf::from("/tmp/lyricist-data"))
}

/// Application config directory.
///
/// Holds `config.toml` and `preferences.toml`. Resolves to
/// `dirs::config_dir()/lyricist/` unless `LYRICIST_CONFIG_DIR` is set.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("LYRICIST_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("lyricist"))
        .unwrap_or_else(|| PathBuf::from("/tmp/lyricist-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// User preferences (`config_dir()/preferences.toml`).
#[must_use]
pub fn preferences_file() -> PathBuf {
    config_dir().join("preferences.toml")
}

/// Recent-files list (`data_dir()/recent_files.json`).
#[must_use]
pub fn recent_files_file() -> PathBuf {
    data_dir().join("recent_files.json")
}

/// Fallback directory for saving new documents when no picker is shown.
#[must_use]
pub fn documents_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| data_dir().join("documents"))
}
