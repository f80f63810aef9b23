//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! This binary reads `RendererEnvelope` messages as newline-delimited JSON
//! from stdin, runs the file lifecycle operations they request, and writes
//! `PlatformEnvelope` messages to stdout.
//!
//! An optional path argument is opened once the renderer reports ready.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::sync::Arc;

use lyricist::LyricistConfig;
use lyricist::files::FileManager;
use lyricist::files::recent::JsonRecentFilesStore;
use lyricist::files::storage::{DirectoryPicker, DiskStorage, FileStorage, NativePicker};
use lyricist::host::channel::renderer_channel;
use lyricist::host::stdio::run_stdio_bridge;
use lyricist::preferences::TomlPreferenceStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LyricistConfig::load_or_default();

    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .init();

    tracing::info!(native_dialogs = config.storage.native_dialogs, "lyricist-host starting");

    let storage: Arc<dyn FileStorage> = if config.storage.native_dialogs {
        Arc::new(DiskStorage::new(NativePicker))
    } else {
        let directory = config.effective_save_directory();
        tracing::info!(directory = %directory.display(), "saving new documents headlessly");
        Arc::new(DiskStorage::new(DirectoryPicker::new(directory)))
    };

    let (channel, outbound) = renderer_channel();
    let manager = Arc::new(FileManager::new(
        channel.clone(),
        Arc::clone(&storage),
        Arc::new(TomlPreferenceStore::default_location()),
        Arc::new(JsonRecentFilesStore::default_location()),
    ));
    manager.add_file_change_listener(|display_name, recent| {
        tracing::info!(
            title = display_name.unwrap_or("Untitled"),
            recent_files = recent.len(),
            "current file changed"
        );
    });

    if let Some(path) = std::env::args_os().nth(1) {
        let identifier = path.to_string_lossy().into_owned();
        match storage.read_file(&identifier).await {
            // Parked until the renderer reports ready.
            Ok(file) => manager.open_file(Some(file)).await,
            Err(e) => tracing::warn!(identifier = %identifier, error = %e, "cannot read initial file"),
        }
    }

    run_stdio_bridge(manager, channel, outbound, &config.host)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "lyricist-host exited with error");
            anyhow::anyhow!("lyricist-host failed: {e}")
        })?;

    tracing::info!("lyricist-host shut down cleanly");
    Ok(())
}
