//! Edit-history extension.
//!
//! Keeps the sequence of saved versions as line-level patches so the editor
//! can offer history across sessions. Stored as `{ "base": .., "patches": [..] }`;
//! replaying every patch over `base` yields the latest saved text.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

use crate::error::{LyricsError, Result};
use crate::files::extension::FileDataExtension;

/// Extension key in the document payload.
pub const HISTORY_KEY: &str = "history";

/// Patches kept before the oldest is folded into the base text.
const MAX_PATCHES: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LineOp {
    Keep { count: usize },
    Delete { count: usize },
    Insert { lines: Vec<String> },
}

/// Line-level edit from one saved version to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    ops: Vec<LineOp>,
}

impl Patch {
    fn between(old: &str, new: &str) -> Self {
        let diff = TextDiff::from_lines(old, new);
        let mut ops: Vec<LineOp> = Vec::new();
        for change in diff.iter_all_changes() {
            match (change.tag(), ops.last_mut()) {
                (ChangeTag::Equal, Some(LineOp::Keep { count })) => *count += 1,
                (ChangeTag::Delete, Some(LineOp::Delete { count })) => *count += 1,
                (ChangeTag::Insert, Some(LineOp::Insert { lines })) => {
                    lines.push(change.value().to_owned());
                }
                (ChangeTag::Equal, _) => ops.push(LineOp::Keep { count: 1 }),
                (ChangeTag::Delete, _) => ops.push(LineOp::Delete { count: 1 }),
                (ChangeTag::Insert, _) => ops.push(LineOp::Insert {
                    lines: vec![change.value().to_owned()],
                }),
            }
        }
        Self { ops }
    }

    fn apply(&self, old: &str) -> Result<String> {
        let mut lines = old.split_inclusive('\n');
        let mut out = String::with_capacity(old.len());
        for op in &self.ops {
            match op {
                LineOp::Keep { count } => {
                    for _ in 0..*count {
                        out.push_str(lines.next().ok_or_else(patch_overrun)?);
                    }
                }
                LineOp::Delete { count } => {
                    for _ in 0..*count {
                        lines.next().ok_or_else(patch_overrun)?;
                    }
                }
                LineOp::Insert { lines: inserted } => {
                    for line in inserted {
                        out.push_str(line);
                    }
                }
            }
        }
        if lines.next().is_some() {
            return Err(LyricsError::UnsupportedFormat(
                "history patch does not cover the whole text".to_owned(),
            ));
        }
        Ok(out)
    }
}

fn patch_overrun() -> LyricsError {
    LyricsError::UnsupportedFormat("history patch runs past the end of the text".to_owned())
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryData {
    base: String,
    patches: Vec<Patch>,
}

/// Records every saved version of the lyrics.
#[derive(Debug, Default)]
pub struct HistoryExtension {
    data: HistoryData,
    current: String,
}

impl HistoryExtension {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the most recent recorded version.
    #[must_use]
    pub fn current_text(&self) -> &str {
        &self.current
    }

    /// Number of recorded edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.patches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.patches.is_empty()
    }

    /// Every retained version, oldest first, starting with the base text.
    pub fn versions(&self) -> Result<Vec<String>> {
        let mut versions = vec![self.data.base.clone()];
        for patch in &self.data.patches {
            let next = patch.apply(versions.last().map_or("", String::as_str))?;
            versions.push(next);
        }
        Ok(versions)
    }

    fn record(&mut self, lyrics: &str) {
        if lyrics == self.current {
            return;
        }
        self.data.patches.push(Patch::between(&self.current, lyrics));
        self.current = lyrics.to_owned();

        while self.data.patches.len() > MAX_PATCHES {
            let oldest = self.data.patches.remove(0);
            match oldest.apply(&self.data.base) {
                Ok(folded) => self.data.base = folded,
                Err(e) => {
                    tracing::warn!(error = %e, "history fold failed; restarting history");
                    self.data = HistoryData {
                        base: self.current.clone(),
                        patches: Vec::new(),
                    };
                }
            }
        }
    }

    fn restore(&mut self, raw: &str) -> Result<()> {
        let data: HistoryData = serde_json::from_str(raw)?;
        let mut current = data.base.clone();
        for patch in &data.patches {
            current = patch.apply(&current)?;
        }
        self.data = data;
        self.current = current;
        Ok(())
    }
}

impl FileDataExtension for HistoryExtension {
    fn key(&self) -> &'static str {
        HISTORY_KEY
    }

    fn on_before_serialization(&mut self, lyrics: &str) {
        self.record(lyrics);
    }

    fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.data)?)
    }

    fn deserialize(&mut self, data: Option<&str>) {
        *self = Self::default();
        if let Some(raw) = data {
            if let Err(e) = self.restore(raw) {
                tracing::warn!(error = %e, "discarding unreadable edit history");
                *self = Self::default();
            }
        }
    }
}
