//! The file lifecycle manager.
//!
//! Coordinates new/open/save between the renderer (which owns the editor
//! text and draws dialogs), the storage capability, the handler and
//! extension registries, preferences and the recent-files list.
//!
//! Every operation is an `async fn` on `&self`. Waits on the renderer or on
//! storage are suspension points; in between, state changes run to
//! completion without holding a lock across an `.await`. Operations are not
//! serialized against each other: each waits only on the reply keys it
//! registered.
//!
//! The current file's identity changes in exactly three places: a new file
//! clears it, and a successful open or save binds it. A failed or cancelled
//! storage call never touches it.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{LyricsError, Result};
use crate::files::dialogs;
use crate::files::extension::{ExtensionRegistry, FileDataExtension};
use crate::files::handler::{
    suggested_file_name, DocumentPayload, FileHandler, FileHandlerRegistry, HandlerKind,
    LoadedDocument,
};
use crate::files::history::HistoryExtension;
use crate::files::recent::{RecentFiles, RecentFilesStore};
use crate::files::storage::{display_name_for, FileStorage, PlatformFile};
use crate::host::channel::{RendererChannel, RendererIntent, Reply, ReplyKey, ReplyListener};
use crate::host::contract::{DialogSpec, PlatformMessage};
use crate::preferences::{PreferenceStore, Preferences};

/// Shown to the user when a file cannot be opened. Details go to the log.
pub const OPEN_FAILED_MESSAGE: &str = "The selected file could not be opened.";

/// Called with `(display_name, recent_files)` whenever the current file
/// changes. `None` means an untitled document.
pub type FileChangeListener = Box<dyn Fn(Option<&str>, &[String]) + Send + Sync>;

/// The file the editor is bound to, with the exact handler that read or
/// last wrote it. Plain saves go back through that handler.
#[derive(Clone)]
pub struct CurrentFile {
    pub identifier: String,
    pub handler: Arc<dyn FileHandler>,
}

impl CurrentFile {
    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        self.handler.kind()
    }
}

impl std::fmt::Debug for CurrentFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentFile")
            .field("identifier", &self.identifier)
            .field("kind", &self.handler.kind())
            .field("extension", &self.handler.extension())
            .finish()
    }
}

/// Operations the platform side starts (menus, OS integration).
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformIntent {
    NewFile,
    OpenFile(Option<PlatformFile>),
    OpenRecent(String),
    Save,
    SaveAs,
    /// The user asked to quit; answered by [`FileManager::dispatch_platform`].
    Quit,
}

#[derive(Debug, Default)]
struct LifecycleState {
    current: Option<CurrentFile>,
    renderer_ready: bool,
    initial_file: Option<PlatformFile>,
}

enum OpenSource {
    /// Let storage produce the file, passing through a dropped one.
    Storage(Option<PlatformFile>),
    /// Re-read a known identifier.
    Identifier(String),
}

pub struct FileManager {
    channel: RendererChannel,
    storage: Arc<dyn FileStorage>,
    preferences: Arc<dyn PreferenceStore>,
    recent: Arc<dyn RecentFilesStore>,
    handlers: FileHandlerRegistry,
    extensions: Mutex<ExtensionRegistry>,
    state: Mutex<LifecycleState>,
    listeners: Mutex<Vec<FileChangeListener>>,
}

impl std::fmt::Debug for FileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileManager")
            .field("handlers", &self.handlers)
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}

impl FileManager {
    /// A manager with the bundled handlers and the edit-history extension.
    pub fn new(
        channel: RendererChannel,
        storage: Arc<dyn FileStorage>,
        preferences: Arc<dyn PreferenceStore>,
        recent: Arc<dyn RecentFilesStore>,
    ) -> Self {
        let mut extensions = ExtensionRegistry::new();
        extensions.register(Box::new(HistoryExtension::new()));
        Self {
            channel,
            storage,
            preferences,
            recent,
            handlers: FileHandlerRegistry::with_defaults(),
            extensions: Mutex::new(extensions),
            state: Mutex::new(LifecycleState::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Replace the handler registry.
    #[must_use]
    pub fn with_handlers(mut self, handlers: FileHandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Replace the extension registry.
    #[must_use]
    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = Mutex::new(extensions);
        self
    }

    pub fn register_extension(&self, extension: Box<dyn FileDataExtension>) {
        self.lock_extensions().register(extension);
    }

    /// Subscribe to identity changes. Listeners are never removed and must
    /// not call back into the manager.
    pub fn add_file_change_listener(
        &self,
        listener: impl Fn(Option<&str>, &[String]) + Send + Sync + 'static,
    ) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(listener));
    }

    #[must_use]
    pub fn current_file(&self) -> Option<CurrentFile> {
        self.lock_state().current.clone()
    }

    #[must_use]
    pub fn is_renderer_ready(&self) -> bool {
        self.lock_state().renderer_ready
    }

    /// The persisted recent-files list. Unreadable storage reads as empty.
    #[must_use]
    pub fn recent_files(&self) -> Vec<String> {
        self.recent.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load recent files");
            Vec::new()
        })
    }

    /// Run an operation the renderer asked for.
    pub async fn dispatch(&self, intent: RendererIntent) {
        match intent {
            RendererIntent::Ready => self.on_renderer_ready().await,
            RendererIntent::NewFile => self.new_file().await,
            RendererIntent::OpenFile(file) => self.open_file(file).await,
            RendererIntent::SaveWithText(text) => self.save_with_text(text).await,
        }
    }

    /// Run an operation the platform asked for.
    ///
    /// Returns whether the platform may carry on. Only [`PlatformIntent::Quit`]
    /// can answer `false`, when the user keeps a modified document open.
    pub async fn dispatch_platform(&self, intent: PlatformIntent) -> bool {
        match intent {
            PlatformIntent::NewFile => self.new_file().await,
            PlatformIntent::OpenFile(file) => self.open_file(file).await,
            PlatformIntent::OpenRecent(identifier) => self.open_recent(identifier).await,
            PlatformIntent::Save => self.save_file(false).await,
            PlatformIntent::SaveAs => self.save_file(true).await,
            PlatformIntent::Quit => return self.confirm_quit().await,
        }
        true
    }

    /// The renderer is listening: start a blank document, then open the
    /// file parked before readiness, if any.
    pub async fn on_renderer_ready(&self) {
        let initial = {
            let mut state = self.lock_state();
            state.renderer_ready = true;
            state.initial_file.take()
        };
        info!("renderer ready");
        self.create_new_file();
        if let Some(file) = initial {
            info!(identifier = %file.identifier(), "opening initial file");
            self.open_file_actual(OpenSource::Storage(Some(file))).await;
        }
    }

    /// New-file request: confirm if the document is modified, then start
    /// a blank document.
    pub async fn new_file(&self) {
        match self.confirm_discard(dialogs::confirm_new_file()).await {
            Ok(true) => self.create_new_file(),
            Ok(false) => debug!("new file declined"),
            Err(e) => warn!(error = %e, "new file aborted"),
        }
    }

    /// Clear identity, tell the renderer, reset extensions, notify.
    fn create_new_file(&self) {
        self.lock_state().current = None;
        self.channel.send(PlatformMessage::NewFileCreated);
        self.lock_extensions().reset_all();
        let recent = self.recent_files();
        self.notify_file_changed(None, &recent);
        debug!("new file created");
    }

    /// Open request, optionally with a file the platform already has
    /// (drag and drop, OS "open with").
    pub async fn open_file(&self, mut file: Option<PlatformFile>) {
        if self.park_until_ready(&mut file) {
            return;
        }
        match self.confirm_discard(dialogs::confirm_open_file()).await {
            Ok(true) => self.open_file_actual(OpenSource::Storage(file)).await,
            Ok(false) => debug!("open declined"),
            Err(e) => warn!(error = %e, "open aborted"),
        }
    }

    /// Re-open a file from the recent list.
    pub async fn open_recent(&self, identifier: String) {
        match self.confirm_discard(dialogs::confirm_open_file()).await {
            Ok(true) => {
                self.open_file_actual(OpenSource::Identifier(identifier))
                    .await;
            }
            Ok(false) => debug!(identifier = %identifier, "open recent declined"),
            Err(e) => warn!(identifier = %identifier, error = %e, "open recent aborted"),
        }
    }

    /// Returns `true` when the request was consumed because the renderer
    /// is not ready yet.
    fn park_until_ready(&self, file: &mut Option<PlatformFile>) -> bool {
        let mut state = self.lock_state();
        if state.renderer_ready {
            return false;
        }
        match file.take() {
            Some(file) => {
                info!(identifier = %file.identifier(), "renderer not ready; parking file");
                if let Some(replaced) = state.initial_file.replace(file) {
                    debug!(identifier = %replaced.identifier(), "replaced unopened initial file");
                }
            }
            None => debug!("open request before renderer ready; ignoring"),
        }
        true
    }

    async fn open_file_actual(&self, source: OpenSource) {
        let closed = self.show_progress(dialogs::opening_file());
        let fetched = self
            .cancelable(closed, |cancel| async move {
                match source {
                    OpenSource::Storage(dropped) => self.storage.open_file(dropped, cancel).await,
                    OpenSource::Identifier(identifier) => {
                        self.storage.read_file(&identifier).await.map(Some)
                    }
                }
            })
            .await;

        match fetched.and_then(|file| file.map(|f| self.load_document(f)).transpose()) {
            Ok(Some(())) => {}
            Ok(None) => debug!("open cancelled or declined"),
            Err(e) => {
                warn!(error = %e, "open failed");
                self.channel.send(PlatformMessage::FileOpened {
                    error: Some(OPEN_FAILED_MESSAGE.to_owned()),
                    text: None,
                    clear_history: false,
                });
            }
        }
        self.close_dialog(dialogs::OPENING_FILE);
    }

    /// Resolve a handler for `file` and make it the current document.
    fn load_document(&self, file: PlatformFile) -> Result<()> {
        let LoadedDocument { handler, payload } = self.handlers.create_file_data(&file)?;
        let identifier = file.metadata.identifier.clone();
        let display_name = file.display_name();

        let kind = handler.kind();
        self.lock_state().current = Some(CurrentFile {
            identifier: identifier.clone(),
            handler,
        });
        self.lock_extensions().load_all(&payload.extensions);
        self.channel.send(PlatformMessage::FileOpened {
            error: None,
            text: Some(payload.lyrics),
            clear_history: true,
        });
        let recent = self.add_recent_file(&identifier);
        self.notify_file_changed(Some(&display_name), &recent);
        info!(identifier = %identifier, handler = ?kind, "file opened");
        Ok(())
    }

    /// Platform save: ask the renderer for the text first.
    pub async fn save_file(&self, force_new_path: bool) {
        self.save(None, force_new_path).await;
    }

    /// Renderer save with the text already attached.
    pub async fn save_with_text(&self, text: String) {
        self.save(Some(text), false).await;
    }

    async fn save(&self, text: Option<String>, force_new_path: bool) {
        if let Err(e) = self.try_save(text, force_new_path).await {
            error!(error = %e, force_new_path, "save failed");
        }
    }

    async fn try_save(&self, text: Option<String>, force_new_path: bool) -> Result<()> {
        let text = match text {
            Some(text) => text,
            None => self.fetch_editor_text().await?,
        };

        let current = self.current_file();
        let (handler, existing) = match current {
            Some(current) if !force_new_path => (current.handler, Some(current.identifier)),
            _ => match self.default_file_handler().await? {
                Some(handler) => (handler, None),
                None => {
                    debug!("save declined at format selection");
                    self.channel.send(PlatformMessage::FileSaveEnded {
                        error: None,
                        display_name: None,
                    });
                    return Ok(());
                }
            },
        };

        let extensions = self.lock_extensions().serialize_all(&text)?;
        let bytes = handler.create(&DocumentPayload {
            lyrics: text.clone(),
            extensions,
        })?;
        let suggested = suggested_file_name(handler.as_ref());

        let closed = self.show_progress(dialogs::saving_file());
        let saved = self
            .cancelable(closed, |cancel| {
                self.storage
                    .save_file(bytes, &suggested, existing.as_deref(), cancel)
            })
            .await;
        self.close_dialog(dialogs::SAVING_FILE);

        let Some(saved) = saved? else {
            debug!("save cancelled or declined");
            self.channel.send(PlatformMessage::FileSaveEnded {
                error: None,
                display_name: None,
            });
            return Ok(());
        };

        let display_name = saved
            .display_name
            .unwrap_or_else(|| display_name_for(&saved.identifier));
        let kind = handler.kind();
        self.lock_state().current = Some(CurrentFile {
            identifier: saved.identifier.clone(),
            handler,
        });
        self.channel
            .send(PlatformMessage::FileModifiedReset { text });
        let recent = self.add_recent_file(&saved.identifier);
        self.notify_file_changed(Some(&display_name), &recent);
        self.channel.send(PlatformMessage::FileSaveEnded {
            error: None,
            display_name: Some(display_name),
        });
        info!(identifier = %saved.identifier, handler = ?kind, "file saved");
        Ok(())
    }

    async fn fetch_editor_text(&self) -> Result<String> {
        self.channel
            .send(PlatformMessage::ShowDialog(dialogs::preparing_save()));
        let reply = self
            .channel
            .request(ReplyKey::EditorText, PlatformMessage::RequestEditorText)
            .await;
        self.close_dialog(dialogs::PREPARING_SAVE);
        match reply? {
            Reply::EditorText(text) => Ok(text),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Handler for a document without one: the persisted choice, or ask.
    ///
    /// `Ok(None)` means the user dismissed the format dialog.
    pub async fn default_file_handler(&self) -> Result<Option<Arc<dyn FileHandler>>> {
        let mut preferences = self.preferences.get().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read preferences; asking for format");
            Preferences::default()
        });
        if let Some(kind) = preferences.default_file_format.fixed_handler() {
            match self.handlers.get(kind) {
                Some(handler) => return Ok(Some(handler)),
                None => warn!(?kind, "preferred format has no handler; asking"),
            }
        }

        let dialog = dialogs::choose_file_format(&self.handlers.kinds());
        let reply = self
            .channel
            .request(
                ReplyKey::dialog(dialogs::CHOOSE_FILE_FORMAT),
                PlatformMessage::ShowDialog(dialog),
            )
            .await?;
        let Reply::DialogInteraction(interaction) = reply else {
            return Ok(None);
        };
        let Some(kind) = interaction
            .selected_option
            .as_deref()
            .and_then(HandlerKind::from_display_name)
        else {
            return Ok(None);
        };

        if interaction.is_checked(dialogs::NEVER_ASK_AGAIN) {
            preferences.default_file_format = kind.into();
            match self.preferences.set(&preferences) {
                Ok(()) => info!(?kind, "default file format saved"),
                Err(e) => warn!(error = %e, "failed to save default file format"),
            }
        }
        Ok(self.handlers.get(kind))
    }

    /// Record a successful open or save and return the updated list.
    pub fn add_recent_file(&self, identifier: &str) -> Vec<String> {
        let mut recent = RecentFiles::from_entries(self.recent_files());
        recent.add(identifier);
        if let Err(e) = self.recent.save(recent.entries()) {
            warn!(identifier = %identifier, error = %e, "failed to save recent files");
        }
        recent.into_entries()
    }

    /// Whether the platform may quit: always when unmodified, otherwise
    /// only after the user confirms.
    pub async fn confirm_quit(&self) -> bool {
        match self.confirm_discard(dialogs::confirm_quit()).await {
            Ok(quit) => quit,
            Err(e) => {
                // No renderer to lose changes in.
                warn!(error = %e, "quit handshake failed; quitting");
                true
            }
        }
    }

    /// Modification handshake, followed by `alert` when modified.
    async fn confirm_discard(&self, alert: DialogSpec) -> Result<bool> {
        let modified = match self
            .channel
            .request(ReplyKey::FileModified, PlatformMessage::CheckFileModified)
            .await?
        {
            Reply::FileModified(modified) => modified,
            other => return Err(unexpected_reply(&other)),
        };
        if !modified {
            return Ok(true);
        }

        let key = ReplyKey::dialog(alert.tag());
        let reply = self
            .channel
            .request(key, PlatformMessage::ShowDialog(alert))
            .await?;
        Ok(matches!(
            reply,
            Reply::DialogInteraction(interaction) if interaction.selected_button == dialogs::YES
        ))
    }

    /// Listen for the dialog's close, then show it.
    fn show_progress(&self, dialog: DialogSpec) -> ReplyListener {
        let closed = self.channel.listen(ReplyKey::dialog(dialog.tag()));
        self.channel.send(PlatformMessage::ShowDialog(dialog));
        closed
    }

    fn close_dialog(&self, tag: &str) {
        self.channel.send(PlatformMessage::CloseDialog {
            tag: tag.to_owned(),
        });
    }

    /// Run a storage call that the user can abort by dismissing the dialog
    /// behind `closed`. A call that has already settled wins over a
    /// dismissal that arrives in the same poll.
    async fn cancelable<T, F, Fut>(&self, closed: ReplyListener, op: F) -> Result<Option<T>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let cancel = CancellationToken::new();
        let io = op(cancel.clone());
        tokio::pin!(io);
        tokio::select! {
            biased;
            result = &mut io => result,
            () = cancel_on_reply(closed, &cancel) => {
                info!("storage operation cancelled by user");
                Ok(None)
            }
        }
    }

    fn notify_file_changed(&self, display_name: Option<&str>, recent: &[String]) {
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener(display_name, recent);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_extensions(&self) -> MutexGuard<'_, ExtensionRegistry> {
        self.extensions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Resolves once the user dismisses the dialog, cancelling `cancel`.
/// A superseded listener never resolves.
async fn cancel_on_reply(closed: ReplyListener, cancel: &CancellationToken) {
    match closed.recv().await {
        Ok(_) => cancel.cancel(),
        Err(e) => {
            debug!(error = %e, "progress dialog listener retired");
            std::future::pending::<()>().await;
        }
    }
}

fn unexpected_reply(reply: &Reply) -> LyricsError {
    LyricsError::Channel(format!("unexpected reply {reply:?}"))
}
