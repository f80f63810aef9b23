//! File format handlers and first-match handler resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LyricsError, Result};
use crate::files::storage::PlatformFile;

/// The formats the app can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Native `.lyrics` documents that carry extension data.
    Lyrics,
    /// Plain `.txt` lyrics without extension data.
    PlainText,
}

impl HandlerKind {
    /// Label shown in the "choose a format" dialog.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Lyrics => "Lyrics (.lyrics)",
            Self::PlainText => "Plain text (.txt)",
        }
    }

    /// Parse a label produced by [`display_name`](Self::display_name).
    #[must_use]
    pub fn from_display_name(label: &str) -> Option<Self> {
        [Self::Lyrics, Self::PlainText]
            .into_iter()
            .find(|kind| kind.display_name() == label)
    }
}

/// Primary text plus opaque per-extension blobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPayload {
    pub lyrics: String,
    pub extensions: BTreeMap<String, String>,
}

impl DocumentPayload {
    #[must_use]
    pub fn from_lyrics(lyrics: impl Into<String>) -> Self {
        Self {
            lyrics: lyrics.into(),
            extensions: BTreeMap::new(),
        }
    }
}

/// A serializer/deserializer for one file format.
pub trait FileHandler: Send + Sync {
    fn kind(&self) -> HandlerKind;

    /// Extension without the dot, used for suggested file names.
    fn extension(&self) -> &'static str;

    /// Whether this handler claims `file`.
    fn can_handle(&self, file: &PlatformFile) -> bool;

    fn load(&self, file: &PlatformFile) -> Result<DocumentPayload>;

    fn create(&self, payload: &DocumentPayload) -> Result<Vec<u8>>;
}

/// Name suggested to the storage layer when saving with `handler`.
#[must_use]
pub fn suggested_file_name(handler: &dyn FileHandler) -> String {
    format!("Lyrics.{}", handler.extension())
}

const LYRICS_FILE_VERSION: u32 = 1;
const LYRICS_KIND: &str = "application/x-lyrics";

#[derive(Debug, Serialize, Deserialize)]
struct LyricsFile {
    version: u32,
    lyrics: String,
    #[serde(default)]
    extensions: BTreeMap<String, String>,
}

/// `.lyrics`: UTF-8 JSON holding the text and every extension blob.
#[derive(Debug, Default)]
pub struct LyricsFileHandler;

impl FileHandler for LyricsFileHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Lyrics
    }

    fn extension(&self) -> &'static str {
        "lyrics"
    }

    fn can_handle(&self, file: &PlatformFile) -> bool {
        file.extension().as_deref() == Some("lyrics") || file.kind.as_deref() == Some(LYRICS_KIND)
    }

    fn load(&self, file: &PlatformFile) -> Result<DocumentPayload> {
        let parsed: LyricsFile = serde_json::from_slice(&file.bytes).map_err(|e| {
            LyricsError::UnsupportedFormat(format!("{} is not a lyrics file: {e}", file.identifier()))
        })?;
        if parsed.version != LYRICS_FILE_VERSION {
            return Err(LyricsError::UnsupportedFormat(format!(
                "{} has lyrics file version {}; expected {}",
                file.identifier(),
                parsed.version,
                LYRICS_FILE_VERSION
            )));
        }
        Ok(DocumentPayload {
            lyrics: parsed.lyrics,
            extensions: parsed.extensions,
        })
    }

    fn create(&self, payload: &DocumentPayload) -> Result<Vec<u8>> {
        let file = LyricsFile {
            version: LYRICS_FILE_VERSION,
            lyrics: payload.lyrics.clone(),
            extensions: payload.extensions.clone(),
        };
        Ok(serde_json::to_vec_pretty(&file)?)
    }
}

/// `.txt`: the bytes are the lyrics. Extension data is not persisted.
#[derive(Debug, Default)]
pub struct PlainTextFileHandler;

impl FileHandler for PlainTextFileHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::PlainText
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn can_handle(&self, file: &PlatformFile) -> bool {
        file.extension().as_deref() == Some("txt")
            || file.kind.as_deref().is_some_and(|kind| kind.starts_with("text/"))
    }

    fn load(&self, file: &PlatformFile) -> Result<DocumentPayload> {
        let lyrics = String::from_utf8(file.bytes.clone()).map_err(|_| {
            LyricsError::UnsupportedFormat(format!("{} is not valid UTF-8", file.identifier()))
        })?;
        Ok(DocumentPayload::from_lyrics(lyrics))
    }

    fn create(&self, payload: &DocumentPayload) -> Result<Vec<u8>> {
        Ok(payload.lyrics.as_bytes().to_vec())
    }
}

/// A handler paired with the document it produced.
pub struct LoadedDocument {
    pub handler: Arc<dyn FileHandler>,
    pub payload: DocumentPayload,
}

/// Ordered set of handlers; the first one that claims a file wins.
#[derive(Clone, Default)]
pub struct FileHandlerRegistry {
    handlers: Vec<Arc<dyn FileHandler>>,
}

impl std::fmt::Debug for FileHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.kind()))
            .finish()
    }
}

impl FileHandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `.lyrics` first, then plain text.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LyricsFileHandler));
        registry.register(Arc::new(PlainTextFileHandler));
        registry
    }

    /// Append a handler. Later handlers are only tried when earlier ones
    /// decline.
    pub fn register(&mut self, handler: Arc<dyn FileHandler>) {
        self.handlers.push(handler);
    }

    /// First registered handler of `kind`.
    #[must_use]
    pub fn get(&self, kind: HandlerKind) -> Option<Arc<dyn FileHandler>> {
        self.handlers.iter().find(|h| h.kind() == kind).cloned()
    }

    /// Registered kinds, in registration order, without duplicates.
    #[must_use]
    pub fn kinds(&self) -> Vec<HandlerKind> {
        let mut kinds = Vec::new();
        for handler in &self.handlers {
            if !kinds.contains(&handler.kind()) {
                kinds.push(handler.kind());
            }
        }
        kinds
    }

    /// Resolve the handler for `file` and load it.
    ///
    /// # Errors
    ///
    /// [`LyricsError::UnsupportedFormat`] when no handler claims the file or
    /// the claiming handler rejects its contents.
    pub fn create_file_data(&self, file: &PlatformFile) -> Result<LoadedDocument> {
        let handler = self
            .handlers
            .iter()
            .find(|h| h.can_handle(file))
            .cloned()
            .ok_or_else(|| {
                LyricsError::UnsupportedFormat(format!("no handler for {}", file.identifier()))
            })?;
        let payload = handler.load(file)?;
        Ok(LoadedDocument { handler, payload })
    }
}
