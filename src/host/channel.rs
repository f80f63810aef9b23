//! Typed renderer channel with one-shot reply listeners.
//!
//! The renderer and the platform only exchange fire-and-forget messages. A
//! request/response exchange (e.g. "is the document modified?") is modelled
//! as a [`ReplyListener`] registered under a [`ReplyKey`] *before* the
//! request is emitted and removed as soon as the reply arrives or the
//! listener is dropped. At most one listener is active per key; registering
//! a second one supersedes the first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{mpsc, oneshot};

use crate::error::{LyricsError, Result};
use crate::files::storage::PlatformFile;
use crate::host::contract::{DialogInteraction, PlatformMessage, RendererMessage};

/// Outbound half of the channel: delivers platform messages to the renderer.
pub trait RendererSink: Send + Sync + 'static {
    fn send(&self, message: PlatformMessage);
}

impl RendererSink for mpsc::UnboundedSender<PlatformMessage> {
    fn send(&self, message: PlatformMessage) {
        let channel = message.channel_name();
        if mpsc::UnboundedSender::send(self, message).is_err() {
            tracing::warn!(channel, "renderer sink closed; dropping message");
        }
    }
}

/// Name under which a reply listener waits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReplyKey {
    FileModified,
    EditorText,
    /// Interaction or close of the dialog with this tag.
    Dialog(String),
}

impl ReplyKey {
    #[must_use]
    pub fn dialog(tag: impl Into<String>) -> Self {
        Self::Dialog(tag.into())
    }
}

/// A reply routed to a listener.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    FileModified(bool),
    EditorText(String),
    DialogInteraction(DialogInteraction),
    DialogClosed,
}

/// Renderer messages that start an operation rather than answer one.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererIntent {
    Ready,
    NewFile,
    OpenFile(Option<PlatformFile>),
    SaveWithText(String),
}

struct Slot {
    id: u64,
    tx: oneshot::Sender<Reply>,
}

struct Inner {
    sink: Box<dyn RendererSink>,
    listeners: Mutex<HashMap<ReplyKey, Slot>>,
    next_id: AtomicU64,
}

impl Inner {
    fn remove_if_current(&self, key: &ReplyKey, id: u64) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        if listeners.get(key).is_some_and(|slot| slot.id == id) {
            listeners.remove(key);
        }
    }
}

/// Shared handle to the renderer channel.
#[derive(Clone)]
pub struct RendererChannel {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RendererChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererChannel")
            .field("pending_listeners", &self.pending_listeners())
            .finish()
    }
}

/// Create a channel whose outbound messages land in an unbounded queue.
#[must_use]
pub fn renderer_channel() -> (RendererChannel, mpsc::UnboundedReceiver<PlatformMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RendererChannel::new(tx), rx)
}

impl RendererChannel {
    pub fn new(sink: impl RendererSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink: Box::new(sink),
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Emit a message to the renderer.
    pub fn send(&self, message: PlatformMessage) {
        tracing::trace!(channel = message.channel_name(), "platform -> renderer");
        self.inner.sink.send(message);
    }

    /// Register a one-shot listener for `key`, superseding any active one.
    #[must_use]
    pub fn listen(&self, key: ReplyKey) -> ReplyListener {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let previous = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), Slot { id, tx });
        if previous.is_some() {
            tracing::debug!(?key, "reply listener superseded");
        }
        ReplyListener {
            key,
            id,
            rx,
            channel: Arc::downgrade(&self.inner),
        }
    }

    /// Register a listener for `key`, emit `ask`, and wait for the reply.
    pub async fn request(&self, key: ReplyKey, ask: PlatformMessage) -> Result<Reply> {
        let listener = self.listen(key);
        self.send(ask);
        listener.recv().await
    }

    /// Route an inbound renderer message.
    ///
    /// Replies are handed to the matching listener (and the listener is
    /// retired); replies nobody waits for are dropped. Operation-starting
    /// messages are returned as intents for the caller to dispatch.
    pub fn deliver(&self, message: RendererMessage) -> Option<RendererIntent> {
        let (key, reply) = match message {
            RendererMessage::ReadyForEvents => return Some(RendererIntent::Ready),
            RendererMessage::NewFileAttempt => return Some(RendererIntent::NewFile),
            RendererMessage::OpenFileAttempt(args) => {
                return Some(RendererIntent::OpenFile(args.and_then(|a| a.file)));
            }
            RendererMessage::SaveFileAttempt { text } => {
                return Some(RendererIntent::SaveWithText(text));
            }
            RendererMessage::IsFileModified { modified } => {
                (ReplyKey::FileModified, Reply::FileModified(modified))
            }
            RendererMessage::EditorText { text } => (ReplyKey::EditorText, Reply::EditorText(text)),
            RendererMessage::DialogInteraction { tag, interaction } => (
                ReplyKey::Dialog(tag),
                Reply::DialogInteraction(interaction),
            ),
            RendererMessage::DialogClosed { tag } => (ReplyKey::Dialog(tag), Reply::DialogClosed),
        };

        let slot = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key);
        match slot {
            Some(slot) => {
                if slot.tx.send(reply).is_err() {
                    tracing::debug!(?key, "reply listener dropped before delivery");
                }
            }
            None => tracing::debug!(?key, "no listener for reply; ignoring"),
        }
        None
    }

    /// Number of listeners currently waiting for a reply.
    #[must_use]
    pub fn pending_listeners(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// A registered one-shot listener. Dropping it deregisters it.
pub struct ReplyListener {
    key: ReplyKey,
    id: u64,
    rx: oneshot::Receiver<Reply>,
    channel: Weak<Inner>,
}

impl ReplyListener {
    #[must_use]
    pub fn key(&self) -> &ReplyKey {
        &self.key
    }

    /// Wait for the reply. Fails if the listener was superseded.
    pub async fn recv(mut self) -> Result<Reply> {
        (&mut self.rx)
            .await
            .map_err(|_| LyricsError::Channel(format!("listener for {:?} superseded", self.key)))
    }
}

impl Drop for ReplyListener {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.upgrade() {
            inner.remove_if_current(&self.key, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn reply_reaches_listener_and_retires_it() {
        let (channel, _rx) = renderer_channel();
        let listener = channel.listen(ReplyKey::FileModified);
        assert_eq!(channel.pending_listeners(), 1);

        let intent = channel.deliver(RendererMessage::IsFileModified { modified: true });
        assert!(intent.is_none());
        assert_eq!(channel.pending_listeners(), 0);
        assert_eq!(listener.recv().await.unwrap(), Reply::FileModified(true));
    }

    #[tokio::test]
    async fn request_emits_after_registering() {
        let (channel, mut rx) = renderer_channel();
        let requester = channel.clone();
        let handle =
            tokio::spawn(async move { requester.request(ReplyKey::EditorText, PlatformMessage::RequestEditorText).await });

        let asked = rx.recv().await.unwrap();
        assert_eq!(asked, PlatformMessage::RequestEditorText);
        channel.deliver(RendererMessage::EditorText {
            text: "Verse one".to_owned(),
        });

        let reply = handle.await.unwrap().unwrap();
        assert_eq!(reply, Reply::EditorText("Verse one".to_owned()));
    }

    #[tokio::test]
    async fn second_listener_supersedes_first() {
        let (channel, _rx) = renderer_channel();
        let first = channel.listen(ReplyKey::FileModified);
        let second = channel.listen(ReplyKey::FileModified);
        assert_eq!(channel.pending_listeners(), 1);

        assert!(matches!(first.recv().await, Err(LyricsError::Channel(_))));
        // Dropping the superseded listener must not remove the live one.
        assert_eq!(channel.pending_listeners(), 1);

        channel.deliver(RendererMessage::IsFileModified { modified: false });
        assert_eq!(second.recv().await.unwrap(), Reply::FileModified(false));
    }

    #[test]
    fn dropped_listener_deregisters() {
        let (channel, _rx) = renderer_channel();
        let listener = channel.listen(ReplyKey::dialog("confirm-new-file"));
        drop(listener);
        assert_eq!(channel.pending_listeners(), 0);
    }

    #[test]
    fn reply_for_retired_tag_is_ignored() {
        let (channel, _rx) = renderer_channel();
        let intent = channel.deliver(RendererMessage::DialogClosed {
            tag: "opening-file".to_owned(),
        });
        assert!(intent.is_none());
        assert_eq!(channel.pending_listeners(), 0);
    }

    #[tokio::test]
    async fn dialog_replies_match_by_tag() {
        let (channel, _rx) = renderer_channel();
        let confirm = channel.listen(ReplyKey::dialog("confirm-open-file"));

        channel.deliver(RendererMessage::DialogClosed {
            tag: "some-other-dialog".to_owned(),
        });
        assert_eq!(channel.pending_listeners(), 1);

        channel.deliver(RendererMessage::DialogInteraction {
            tag: "confirm-open-file".to_owned(),
            interaction: DialogInteraction::button("Yes"),
        });
        assert_eq!(
            confirm.recv().await.unwrap(),
            Reply::DialogInteraction(DialogInteraction::button("Yes"))
        );
    }

    #[test]
    fn intents_are_returned_not_routed() {
        let (channel, _rx) = renderer_channel();
        assert_eq!(
            channel.deliver(RendererMessage::ReadyForEvents),
            Some(RendererIntent::Ready)
        );
        assert_eq!(
            channel.deliver(RendererMessage::SaveFileAttempt {
                text: "Chorus".to_owned()
            }),
            Some(RendererIntent::SaveWithText("Chorus".to_owned()))
        );
    }

    #[test]
    fn bare_open_attempt_becomes_an_open_intent() {
        let (channel, _rx) = renderer_channel();
        let bare: RendererMessage =
            serde_json::from_str(r#"{"channel":"open-file-attempt"}"#).unwrap();
        assert_eq!(channel.deliver(bare), Some(RendererIntent::OpenFile(None)));

        let file = PlatformFile::new("/songs/dropped.txt", "verse");
        assert_eq!(
            channel.deliver(RendererMessage::open_file(Some(file.clone()))),
            Some(RendererIntent::OpenFile(Some(file)))
        );
    }
}
