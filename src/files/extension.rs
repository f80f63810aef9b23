//! File-data extensions: auxiliary serializers embedded next to the lyrics.
//!
//! Extensions are independent of the file handler. The lifecycle manager
//! feeds every registered extension exactly one `deserialize` per open or
//! new-file transition (`None` for a new file) and exactly one
//! `on_before_serialization` + `serialize` pair per save. Handlers that cannot
//! store extension data (plain text) simply drop the blobs.

use std::collections::BTreeMap;

use crate::error::Result;

/// An auxiliary serializer whose payload travels with the document.
pub trait FileDataExtension: Send {
    /// Key of this extension's blob in [`DocumentPayload::extensions`](crate::files::handler::DocumentPayload).
    fn key(&self) -> &'static str;

    /// Called with the final text right before a save serializes.
    fn on_before_serialization(&mut self, lyrics: &str);

    /// Encode the extension state as JSON text.
    fn serialize(&self) -> Result<String>;

    /// Restore state from a saved blob, or reset when `data` is `None`.
    fn deserialize(&mut self, data: Option<&str>);
}

/// The registered extensions, in registration order.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn FileDataExtension>>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extension: Box<dyn FileDataExtension>) {
        self.extensions.push(extension);
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|e| e.key()).collect()
    }

    /// Reset every extension for a fresh document.
    pub fn reset_all(&mut self) {
        for extension in &mut self.extensions {
            extension.deserialize(None);
        }
    }

    /// Hand each extension its slice of a loaded document (or `None`).
    pub fn load_all(&mut self, blobs: &BTreeMap<String, String>) {
        for extension in &mut self.extensions {
            extension.deserialize(blobs.get(extension.key()).map(String::as_str));
        }
    }

    /// Run every pre-serialization hook with `lyrics`, then collect every
    /// extension's blob.
    ///
    /// # Errors
    ///
    /// Fails if any extension cannot encode its state.
    pub fn serialize_all(&mut self, lyrics: &str) -> Result<BTreeMap<String, String>> {
        for extension in &mut self.extensions {
            extension.on_before_serialization(lyrics);
        }
        self.extensions
            .iter()
            .map(|extension| Ok((extension.key().to_owned(), extension.serialize()?)))
            .collect()
    }
}
