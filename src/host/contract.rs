//! Versioned renderer/platform message envelopes.
//!
//! Every message crossing the process boundary is one variant of
//! [`RendererMessage`] (renderer -> platform) or [`PlatformMessage`]
//! (platform -> renderer). On the wire each variant is an object with a
//! kebab-case `channel` name and an optional `args` payload:
//!
//! ```json
//! {"channel": "is-file-modified", "args": {"modified": true}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::files::storage::PlatformFile;

/// Contract version for renderer/platform envelopes.
pub const CONTRACT_VERSION: u32 = 1;

/// Messages the renderer sends to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "args", rename_all = "kebab-case")]
pub enum RendererMessage {
    /// The renderer has registered its listeners and can receive events.
    ReadyForEvents,
    NewFileAttempt,
    /// Open a file. `args` may be left out entirely; a file is attached
    /// for drag-and-drop payloads.
    OpenFileAttempt(Option<OpenFileArgs>),
    /// Save with the editor text the renderer already has at hand.
    SaveFileAttempt { text: String },
    /// Reply to [`PlatformMessage::CheckFileModified`].
    IsFileModified { modified: bool },
    /// Reply to [`PlatformMessage::RequestEditorText`].
    EditorText { text: String },
    DialogInteraction {
        tag: String,
        interaction: DialogInteraction,
    },
    DialogClosed { tag: String },
}

/// Arguments of [`RendererMessage::OpenFileAttempt`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenFileArgs {
    #[serde(default)]
    pub file: Option<PlatformFile>,
}

impl RendererMessage {
    /// An open request, with the dropped file if there is one.
    #[must_use]
    pub fn open_file(file: Option<PlatformFile>) -> Self {
        Self::OpenFileAttempt(Some(OpenFileArgs { file }))
    }

    /// Wire name of the message channel.
    #[must_use]
    pub fn channel_name(&self) -> &'static str {
        match self {
            Self::ReadyForEvents => "ready-for-events",
            Self::NewFileAttempt => "new-file-attempt",
            Self::OpenFileAttempt(_) => "open-file-attempt",
            Self::SaveFileAttempt { .. } => "save-file-attempt",
            Self::IsFileModified { .. } => "is-file-modified",
            Self::EditorText { .. } => "editor-text",
            Self::DialogInteraction { .. } => "dialog-interaction",
            Self::DialogClosed { .. } => "dialog-closed",
        }
    }
}

/// Messages the platform sends to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "args", rename_all = "kebab-case")]
pub enum PlatformMessage {
    CheckFileModified,
    RequestEditorText,
    NewFileCreated,
    FileOpened {
        error: Option<String>,
        text: Option<String>,
        clear_history: bool,
    },
    FileSaveEnded {
        error: Option<String>,
        display_name: Option<String>,
    },
    /// The document was persisted; `text` is the new clean baseline.
    FileModifiedReset { text: String },
    ShowDialog(DialogSpec),
    CloseDialog { tag: String },
}

impl PlatformMessage {
    /// Wire name of the message channel.
    #[must_use]
    pub fn channel_name(&self) -> &'static str {
        match self {
            Self::CheckFileModified => "check-file-modified",
            Self::RequestEditorText => "request-editor-text",
            Self::NewFileCreated => "new-file-created",
            Self::FileOpened { .. } => "file-opened",
            Self::FileSaveEnded { .. } => "file-save-ended",
            Self::FileModifiedReset { .. } => "file-modified-reset",
            Self::ShowDialog(_) => "show-dialog",
            Self::CloseDialog { .. } => "close-dialog",
        }
    }
}

/// Dialogs the renderer can display on the platform's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DialogSpec {
    Fullscreen {
        tag: String,
        message: String,
        progress: DialogProgress,
        cancelable: bool,
    },
    Alert {
        tag: String,
        title: String,
        message: Option<String>,
        buttons: Vec<String>,
    },
    Selection {
        tag: String,
        title: String,
        message: Option<String>,
        options: Vec<String>,
        checkbox: Option<DialogCheckbox>,
    },
}

impl DialogSpec {
    /// Correlation tag of this dialog.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Fullscreen { tag, .. } | Self::Alert { tag, .. } | Self::Selection { tag, .. } => {
                tag
            }
        }
    }
}

/// Progress shown by a fullscreen dialog: a fraction in `0.0..=1.0` or the
/// literal string `"indeterminate"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DialogProgress {
    Fraction(f32),
    Spinner(Indeterminate),
}

impl DialogProgress {
    pub const INDETERMINATE: Self = Self::Spinner(Indeterminate::Indeterminate);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indeterminate {
    Indeterminate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogCheckbox {
    pub label: String,
}

/// What the user did with a dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogInteraction {
    pub selected_button: String,
    #[serde(default)]
    pub selected_option: Option<String>,
    /// Checkbox label -> checked.
    #[serde(default)]
    pub checkboxes: BTreeMap<String, bool>,
}

impl DialogInteraction {
    #[must_use]
    pub fn button(label: impl Into<String>) -> Self {
        Self {
            selected_button: label.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_checked(&self, label: &str) -> bool {
        self.checkboxes.get(label).copied().unwrap_or(false)
    }
}

/// A versioned envelope from renderer -> platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererEnvelope {
    pub v: u32,
    pub message: RendererMessage,
}

impl RendererEnvelope {
    /// Build an envelope at the current contract version.
    #[must_use]
    pub fn new(message: RendererMessage) -> Self {
        Self {
            v: CONTRACT_VERSION,
            message,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != CONTRACT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, CONTRACT_VERSION
                ),
            ));
        }
        match &self.message {
            RendererMessage::DialogInteraction { tag, .. } | RendererMessage::DialogClosed { tag }
                if tag.trim().is_empty() =>
            {
                Err(ContractError::new(
                    ContractErrorKind::InvalidEnvelope,
                    "dialog tag cannot be empty".to_owned(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// A versioned envelope from platform -> renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEnvelope {
    pub v: u32,
    pub event_id: String,
    pub message: PlatformMessage,
}

impl PlatformEnvelope {
    #[must_use]
    pub fn new(event_id: impl Into<String>, message: PlatformMessage) -> Self {
        Self {
            v: CONTRACT_VERSION,
            event_id: event_id.into(),
            message,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}
