//! Stdin/stdout JSON bridge between the renderer and the file manager.
//!
//! Reads newline-delimited JSON `RendererEnvelope` messages from stdin,
//! routes replies to waiting listeners and hands operation requests to the
//! [`FileManager`], and writes every outbound `PlatformEnvelope` as a JSON
//! line to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;

use crate::config::HostConfig;
use crate::error::{LyricsError, Result};
use crate::files::FileManager;
use crate::host::channel::{RendererChannel, RendererIntent};
use crate::host::contract::{PlatformEnvelope, PlatformMessage, RendererEnvelope};

/// Run the bridge on the process's stdin and stdout until stdin closes.
pub async fn run_stdio_bridge(
    manager: Arc<FileManager>,
    channel: RendererChannel,
    outbound: mpsc::UnboundedReceiver<PlatformMessage>,
    config: &HostConfig,
) -> Result<()> {
    run_bridge(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        manager,
        channel,
        outbound,
        config.inbound_capacity,
    )
    .await
}

/// Run the bridge over arbitrary line streams.
///
/// Three concurrent tasks operate in parallel:
///
/// 1. **Reader** -- reads JSON lines, delivers replies to the channel and
///    queues operation intents.
/// 2. **Dispatcher** -- spawns one manager operation per queued intent, so a
///    long-running open never blocks the replies it is waiting for.
/// 3. **Event forwarder** -- wraps outbound platform messages in envelopes
///    and writes them as JSON lines.
///
/// The bridge exits when the reader reaches EOF. Operations still waiting
/// on the renderer at that point are left to be dropped with the runtime.
pub async fn run_bridge<R, W>(
    reader: R,
    writer: W,
    manager: Arc<FileManager>,
    channel: RendererChannel,
    mut outbound: mpsc::UnboundedReceiver<PlatformMessage>,
    inbound_capacity: usize,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (intent_tx, mut intent_rx) = mpsc::channel::<RendererIntent>(inbound_capacity.max(1));

    let event_handle = tokio::spawn(async move {
        let mut writer = BufWriter::new(writer);
        while let Some(message) = outbound.recv().await {
            let envelope = PlatformEnvelope::new(uuid::Uuid::new_v4().to_string(), message);
            match serde_json::to_string(&envelope) {
                Ok(json) => {
                    if let Err(e) = write_line(&mut writer, &json).await {
                        tracing::warn!(
                            error = %e,
                            "failed to write platform envelope; stopping event forwarder"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize platform envelope; skipping");
                }
            }
        }
    });

    let dispatch_handle = tokio::spawn(async move {
        while let Some(intent) = intent_rx.recv().await {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.dispatch(intent).await });
        }
    });

    let reader_result = run_reader(reader, &channel, intent_tx).await;

    if let Err(e) = dispatch_handle.await {
        tracing::warn!(error = %e, "intent dispatcher stopped abnormally");
    }
    event_handle.abort();
    let _ = event_handle.await;

    reader_result
}

/// Read lines until EOF, routing each envelope.
async fn run_reader<R: AsyncBufRead + Unpin>(
    mut reader: R,
    channel: &RendererChannel,
    intents: mpsc::Sender<RendererIntent>,
) -> Result<()> {
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| LyricsError::Channel(format!("failed to read from stdin: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("stdin closed (EOF); shutting down stdio bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: RendererEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    raw_line = %trimmed,
                    "failed to parse renderer envelope"
                );
                continue;
            }
        };
        if let Err(e) = envelope.validate() {
            tracing::warn!(error = %e, "rejected renderer envelope");
            continue;
        }

        tracing::trace!(channel = envelope.message.channel_name(), "renderer -> platform");
        if let Some(intent) = channel.deliver(envelope.message) {
            if intents.send(intent).await.is_err() {
                return Err(LyricsError::Channel("intent dispatcher stopped".to_owned()));
            }
        }
    }

    Ok(())
}

/// Write a single JSON line and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut BufWriter<W>, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| LyricsError::Channel(format!("failed to write to stdout: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| LyricsError::Channel(format!("failed to write newline to stdout: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| LyricsError::Channel(format!("failed to flush stdout: {e}")))?;
    Ok(())
}
