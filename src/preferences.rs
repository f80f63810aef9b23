//! Persisted user preferences.
//!
//! The only preference the host owns is the default save format, consulted
//! when a document without a bound handler is saved.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{LyricsError, Result};
use crate::files::handler::HandlerKind;

/// Which format a first save uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultFileFormat {
    /// Ask every time with a selection dialog.
    #[default]
    AlwaysAsk,
    Lyrics,
    PlainText,
}

impl DefaultFileFormat {
    /// The fixed handler for this policy, or `None` for [`AlwaysAsk`](Self::AlwaysAsk).
    #[must_use]
    pub fn fixed_handler(self) -> Option<HandlerKind> {
        match self {
            Self::AlwaysAsk => None,
            Self::Lyrics => Some(HandlerKind::Lyrics),
            Self::PlainText => Some(HandlerKind::PlainText),
        }
    }
}

impl From<HandlerKind> for DefaultFileFormat {
    fn from(kind: HandlerKind) -> Self {
        match kind {
            HandlerKind::Lyrics => Self::Lyrics,
            HandlerKind::PlainText => Self::PlainText,
        }
    }
}

/// The persisted preferences record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub default_file_format: DefaultFileFormat,
}

/// Get/set access to the preferences record.
pub trait PreferenceStore: Send + Sync {
    fn get(&self) -> Result<Preferences>;
    fn set(&self, preferences: &Preferences) -> Result<()>;
}

/// Preferences stored as TOML.
#[derive(Debug, Clone)]
pub struct TomlPreferenceStore {
    path: PathBuf,
}

impl TomlPreferenceStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn default_location() -> Self {
        Self::new(crate::app_dirs::preferences_file())
    }
}

impl PreferenceStore for TomlPreferenceStore {
    /// Missing file means defaults.
    fn get(&self) -> Result<Preferences> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                toml::from_str(&contents).map_err(|e| LyricsError::Preferences(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(preferences)
            .map_err(|e| LyricsError::Preferences(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// In-process preferences, for tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    preferences: Mutex<Preferences>,
}

impl MemoryPreferenceStore {
    #[must_use]
    pub fn new(preferences: Preferences) -> Self {
        Self {
            preferences: Mutex::new(preferences),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self) -> Result<Preferences> {
        Ok(self
            .preferences
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn set(&self, preferences: &Preferences) -> Result<()> {
        *self.preferences.lock().unwrap_or_else(|e| e.into_inner()) = preferences.clone();
        Ok(())
    }
}
