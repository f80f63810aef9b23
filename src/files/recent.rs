//! Recently used files: most-recent first, deduplicated, capped.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{LyricsError, Result};

/// Maximum number of remembered files.
pub const MAX_RECENT_FILES: usize = 10;

/// Ordered list of recently used identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentFiles {
    entries: Vec<String>,
}

impl RecentFiles {
    /// Build from a persisted list, re-establishing the invariants in case
    /// the stored list was edited by hand.
    #[must_use]
    pub fn from_entries(entries: Vec<String>) -> Self {
        let mut recent = Self::default();
        for entry in entries.into_iter().rev() {
            recent.add(entry);
        }
        recent
    }

    /// Move `identifier` to the front, dropping older duplicates and
    /// anything past [`MAX_RECENT_FILES`].
    pub fn add(&mut self, identifier: impl Into<String>) {
        let identifier = identifier.into();
        self.entries.retain(|existing| *existing != identifier);
        self.entries.insert(0, identifier);
        self.entries.truncate(MAX_RECENT_FILES);
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Persistence for the recent-files list.
pub trait RecentFilesStore: Send + Sync {
    fn load(&self) -> Result<Vec<String>>;
    fn save(&self, entries: &[String]) -> Result<()>;
}

/// Recent files stored as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonRecentFilesStore {
    path: PathBuf,
}

impl JsonRecentFilesStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default data-directory location.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(crate::app_dirs::recent_files_file())
    }
}

impl RecentFilesStore for JsonRecentFilesStore {
    fn load(&self) -> Result<Vec<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                LyricsError::RecentFiles(format!("failed to parse {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-process store, for tests and platforms without persistence.
#[derive(Debug, Default)]
pub struct MemoryRecentFilesStore {
    entries: Mutex<Vec<String>>,
}

impl MemoryRecentFilesStore {
    #[must_use]
    pub fn with_entries(entries: Vec<String>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl RecentFilesStore for MemoryRecentFilesStore {
    fn load(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, entries: &[String]) -> Result<()> {
        *self.entries.lock().unwrap_or_else(|e| e.into_inner()) = entries.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn ids(recent: &RecentFiles) -> Vec<&str> {
        recent.entries().iter().map(String::as_str).collect()
    }

    #[test]
    fn add_puts_newest_first() {
        let mut recent = RecentFiles::from_entries(vec!["1".into(), "2".into(), "3".into()]);
        recent.add("whitetuxedo.txt");
        assert_eq!(ids(&recent), vec!["whitetuxedo.txt", "1", "2", "3"]);
    }

    #[test]
    fn re_adding_moves_to_front_without_duplicating() {
        let mut recent = RecentFiles::from_entries(vec!["1".into(), "2".into(), "3".into()]);
        recent.add("3");
        assert_eq!(ids(&recent), vec!["3", "1", "2"]);
    }

    #[test]
    fn eleven_distinct_adds_keep_ten_most_recent() {
        let mut recent = RecentFiles::default();
        for i in 0..11 {
            recent.add(format!("song-{i}.lyrics"));
        }
        let expected: Vec<String> = (1..11).rev().map(|i| format!("song-{i}.lyrics")).collect();
        assert_eq!(recent.entries(), expected.as_slice());
    }

    #[test]
    fn invariants_hold_for_mixed_sequences() {
        let mut recent = RecentFiles::default();
        let sequence = [3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7, 9, 3, 2, 3, 8, 4, 6, 2, 6, 4, 3];
        for (step, n) in sequence.iter().enumerate() {
            let id = format!("{n}");
            recent.add(id.clone());

            assert!(recent.entries().len() <= MAX_RECENT_FILES);
            assert_eq!(recent.entries()[0], id, "step {step}");
            let mut unique = recent.entries().to_vec();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), recent.entries().len());
        }
    }

    #[test]
    fn from_entries_repairs_stored_list() {
        let stored: Vec<String> = ["a", "b", "a", "c"].iter().map(|s| (*s).to_owned()).collect();
        let recent = RecentFiles::from_entries(stored);
        assert_eq!(ids(&recent), vec!["a", "b", "c"]);
    }

    #[test]
    fn json_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonRecentFilesStore::new(dir.path().join("data").join("recent_files.json"));
        assert!(store.load().unwrap().is_empty());

        store.save(&["b.txt".to_owned(), "a.lyrics".to_owned()]).unwrap();
        assert_eq!(store.load().unwrap(), vec!["b.txt", "a.lyrics"]);
    }

    #[test]
    fn json_store_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recent_files.json");
        std::fs::write(&path, "{not a list").unwrap();
        let err = JsonRecentFilesStore::new(&path).load().unwrap_err();
        assert!(matches!(err, LyricsError::RecentFiles(_)));
    }
}
