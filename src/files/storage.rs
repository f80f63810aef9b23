//! File storage capability and its local-disk implementation.
//!
//! The lifecycle manager never touches the filesystem directly. It asks a
//! [`FileStorage`] to open, save or read files, passing a
//! [`CancellationToken`] for operations the user can abort. `Ok(None)`
//! always means "the user backed out" (or cancelled); unreachable media and
//! failed reads/writes are reported as errors.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{LyricsError, Result};

/// Identity of a file as the platform knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Opaque platform identifier (a path on desktop).
    pub identifier: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A file handed over by the storage layer, consumed once by handler resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFile {
    pub metadata: FileMetadata,
    pub bytes: Vec<u8>,
    /// MIME type or platform-specific kind, when known.
    #[serde(default)]
    pub kind: Option<String>,
}

impl PlatformFile {
    #[must_use]
    pub fn new(identifier: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            metadata: FileMetadata {
                identifier: identifier.into(),
                display_name: None,
            },
            bytes: bytes.into(),
            kind: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.metadata.identifier
    }

    /// Name to show the user: the explicit display name, else the last
    /// path component of the identifier.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.metadata
            .display_name
            .clone()
            .unwrap_or_else(|| display_name_for(&self.metadata.identifier))
    }

    /// Lower-cased extension of the identifier, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.metadata.identifier)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub identifier: String,
    pub display_name: Option<String>,
}

/// Last path component of an identifier, or the identifier itself.
#[must_use]
pub fn display_name_for(identifier: &str) -> String {
    Path::new(identifier)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| identifier.to_owned())
}

/// Platform capability for reading and writing documents.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Open `dropped` if given, otherwise let the user pick a file.
    async fn open_file(
        &self,
        dropped: Option<PlatformFile>,
        cancel: CancellationToken,
    ) -> Result<Option<PlatformFile>>;

    /// Write `bytes` to `existing`, or to a location the user picks
    /// (starting from `suggested_name`) when `existing` is `None`.
    async fn save_file(
        &self,
        bytes: Vec<u8>,
        suggested_name: &str,
        existing: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Option<SavedFile>>;

    /// Read a previously known file by identifier.
    async fn read_file(&self, identifier: &str) -> Result<PlatformFile>;
}

/// Chooses filesystem locations on the user's behalf.
///
/// `Ok(None)` means the user backed out; an unreachable location is an
/// error.
#[async_trait]
pub trait FilePicker: Send + Sync {
    async fn pick_open(&self) -> Result<Option<PathBuf>>;
    async fn pick_save(&self, suggested_name: &str) -> Result<Option<PathBuf>>;
}

/// OS-native open/save dialogs.
#[derive(Debug, Default)]
pub struct NativePicker;

#[async_trait]
impl FilePicker for NativePicker {
    async fn pick_open(&self) -> Result<Option<PathBuf>> {
        tokio::task::spawn_blocking(|| {
            rfd::FileDialog::new()
                .add_filter("Lyrics", &["lyrics"])
                .add_filter("Plain text", &["txt"])
                .pick_file()
        })
        .await
        .map_err(|e| LyricsError::Storage(format!("open dialog failed: {e}")))
    }

    async fn pick_save(&self, suggested_name: &str) -> Result<Option<PathBuf>> {
        let suggested_name = suggested_name.to_owned();
        tokio::task::spawn_blocking(move || {
            rfd::FileDialog::new()
                .set_file_name(&suggested_name)
                .save_file()
        })
        .await
        .map_err(|e| LyricsError::Storage(format!("save dialog failed: {e}")))
    }
}

/// Headless picker: never offers a file to open and saves new documents
/// into a fixed directory under a name that does not collide.
#[derive(Debug, Clone)]
pub struct DirectoryPicker {
    directory: PathBuf,
}

impl DirectoryPicker {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl FilePicker for DirectoryPicker {
    async fn pick_open(&self) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    async fn pick_save(&self, suggested_name: &str) -> Result<Option<PathBuf>> {
        let unavailable = |e: std::io::Error| {
            LyricsError::Storage(format!(
                "save directory {} is unavailable: {e}",
                self.directory.display()
            ))
        };
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(unavailable)?;
        let suggested = Path::new(suggested_name);
        let stem = suggested
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Lyrics".to_owned());
        let extension = suggested
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut candidate = self.directory.join(suggested_name);
        let mut n = 2;
        while tokio::fs::try_exists(&candidate).await.map_err(unavailable)? {
            candidate = self.directory.join(format!("{stem} ({n}){extension}"));
            n += 1;
        }
        Ok(Some(candidate))
    }
}

/// Map a path's extension to the kind reported on [`PlatformFile`].
#[must_use]
pub fn kind_for_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    let kind = match ext.as_str() {
        "lyrics" => "application/x-lyrics",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        _ => return None,
    };
    Some(kind.to_owned())
}

/// [`FileStorage`] backed by the local filesystem.
pub struct DiskStorage {
    picker: Box<dyn FilePicker>,
}

impl std::fmt::Debug for DiskStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskStorage").finish_non_exhaustive()
    }
}

impl DiskStorage {
    pub fn new(picker: impl FilePicker + 'static) -> Self {
        Self {
            picker: Box::new(picker),
        }
    }

    async fn read_path(path: &Path) -> Result<PlatformFile> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LyricsError::Storage(format!("failed to read {}: {e}", path.display())))?;
        let identifier = path.to_string_lossy().into_owned();
        Ok(PlatformFile {
            metadata: FileMetadata {
                display_name: Some(display_name_for(&identifier)),
                identifier,
            },
            bytes,
            kind: kind_for_path(path),
        })
    }
}

#[async_trait]
impl FileStorage for DiskStorage {
    async fn open_file(
        &self,
        dropped: Option<PlatformFile>,
        cancel: CancellationToken,
    ) -> Result<Option<PlatformFile>> {
        if let Some(file) = dropped {
            return Ok(Some(file));
        }
        let Some(path) = self.picker.pick_open().await? else {
            return Ok(None);
        };
        if cancel.is_cancelled() {
            return Ok(None);
        }
        Self::read_path(&path).await.map(Some)
    }

    async fn save_file(
        &self,
        bytes: Vec<u8>,
        suggested_name: &str,
        existing: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Option<SavedFile>> {
        let path = match existing {
            Some(identifier) => PathBuf::from(identifier),
            None => match self.picker.pick_save(suggested_name).await? {
                Some(path) => path,
                None => return Ok(None),
            },
        };
        if cancel.is_cancelled() {
            return Ok(None);
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| LyricsError::Storage(format!("failed to write {}: {e}", path.display())))?;

        let identifier = path.to_string_lossy().into_owned();
        tracing::debug!(identifier = %identifier, bytes = bytes.len(), "file written");
        Ok(Some(SavedFile {
            display_name: Some(display_name_for(&identifier)),
            identifier,
        }))
    }

    async fn read_file(&self, identifier: &str) -> Result<PlatformFile> {
        Self::read_path(Path::new(identifier)).await
    }
}
