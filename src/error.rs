//! Error types for the lyricist host.

/// Top-level error type for the platform side of the app.
#[derive(Debug, thiserror::Error)]
pub enum LyricsError {
    /// Storage backend failed (unreachable medium, permission, bad path).
    #[error("storage error: {0}")]
    Storage(String),

    /// No registered handler claims a file, or a handler rejected its bytes.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Preference persistence error.
    #[error("preferences error: {0}")]
    Preferences(String),

    /// Recent-files persistence error.
    #[error("recent files error: {0}")]
    RecentFiles(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Renderer channel closed or a reply listener was dropped.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, LyricsError>;
