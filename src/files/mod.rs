//! Document lifecycle: storage, formats, extensions, recents and the
//! manager that ties them to the renderer.

pub mod dialogs;
pub mod extension;
pub mod handler;
pub mod history;
pub mod manager;
pub mod recent;
pub mod storage;

pub use manager::{CurrentFile, FileManager, PlatformIntent};
