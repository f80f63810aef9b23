//! Lyricist: platform-side file lifecycle for a lyrics editor.
//!
//! The editor UI (the renderer) and the platform exchange typed messages
//! over a [`host::channel::RendererChannel`]. The platform side owns files:
//! the [`files::FileManager`] coordinates new/open/save with the renderer,
//! resolves file formats through [`files::handler`], carries extension data
//! such as edit history through [`files::extension`], and keeps the
//! recent-files list and preferences up to date.
//!
//! # Architecture
//!
//! - **Contract**: versioned renderer/platform envelopes ([`host::contract`])
//! - **Channel**: fire-and-forget messages plus one-shot reply listeners
//! - **Manager**: the lifecycle state machine
//! - **Storage**: an async capability with a local-disk implementation
//! - **Bridge**: newline-delimited JSON over stdio ([`host::stdio`])

pub mod app_dirs;
pub mod config;
pub mod error;
pub mod files;
pub mod host;
pub mod preferences;

pub use config::LyricistConfig;
pub use error::{LyricsError, Result};
pub use files::{CurrentFile, FileManager, PlatformIntent};
pub use host::channel::{RendererChannel, renderer_channel};
pub use preferences::{DefaultFileFormat, Preferences};
