//! Dialog tags and the dialogs the lifecycle manager shows.
//!
//! A tag is bound to a reply listener immediately before its dialog is
//! shown and retired when the renderer reports an interaction with, or the
//! closing of, that dialog.

use crate::files::handler::HandlerKind;
use crate::host::contract::{DialogCheckbox, DialogProgress, DialogSpec};

pub const CONFIRM_NEW_FILE: &str = "confirm-new-file";
pub const CONFIRM_OPEN_FILE: &str = "confirm-open-file";
pub const CONFIRM_QUIT: &str = "confirm-quit";
pub const CHOOSE_FILE_FORMAT: &str = "choose-file-format";
pub const OPENING_FILE: &str = "opening-file";
pub const PREPARING_SAVE: &str = "preparing-save";
pub const SAVING_FILE: &str = "saving-file";

/// Affirmative button of every confirmation alert.
pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const NEVER_ASK_AGAIN: &str = "Never ask again";

fn confirm(tag: &str, title: &str, message: &str) -> DialogSpec {
    DialogSpec::Alert {
        tag: tag.to_owned(),
        title: title.to_owned(),
        message: Some(message.to_owned()),
        buttons: vec![YES.to_owned(), NO.to_owned()],
    }
}

#[must_use]
pub fn confirm_new_file() -> DialogSpec {
    confirm(
        CONFIRM_NEW_FILE,
        "Discard unsaved changes?",
        "Creating a new file will discard your unsaved changes.",
    )
}

#[must_use]
pub fn confirm_open_file() -> DialogSpec {
    confirm(
        CONFIRM_OPEN_FILE,
        "Discard unsaved changes?",
        "Opening a file will discard your unsaved changes.",
    )
}

#[must_use]
pub fn confirm_quit() -> DialogSpec {
    confirm(
        CONFIRM_QUIT,
        "Quit without saving?",
        "Your unsaved changes will be lost.",
    )
}

/// Format picker offering `kinds` in registration order.
#[must_use]
pub fn choose_file_format(kinds: &[HandlerKind]) -> DialogSpec {
    DialogSpec::Selection {
        tag: CHOOSE_FILE_FORMAT.to_owned(),
        title: "Choose a file type".to_owned(),
        message: Some("Plain text files can't store your edit history.".to_owned()),
        options: kinds.iter().map(|k| k.display_name().to_owned()).collect(),
        checkbox: Some(DialogCheckbox {
            label: NEVER_ASK_AGAIN.to_owned(),
        }),
    }
}

fn progress(tag: &str, message: &str, cancelable: bool) -> DialogSpec {
    DialogSpec::Fullscreen {
        tag: tag.to_owned(),
        message: message.to_owned(),
        progress: DialogProgress::INDETERMINATE,
        cancelable,
    }
}

#[must_use]
pub fn opening_file() -> DialogSpec {
    progress(OPENING_FILE, "Opening file...", true)
}

#[must_use]
pub fn preparing_save() -> DialogSpec {
    progress(PREPARING_SAVE, "Preparing to save...", false)
}

#[must_use]
pub fn saving_file() -> DialogSpec {
    progress(SAVING_FILE, "Saving file...", true)
}
