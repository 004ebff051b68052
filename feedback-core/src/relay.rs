//! Stream relay: upstream NDJSON in, ordered events out
//!
//! The upstream transport delivers byte chunks whose boundaries are
//! unrelated to record boundaries. [`LineBuffer`] reassembles complete
//! newline-terminated records across reads, and [`relay`] turns them into a
//! strictly ordered event sequence: zero or more chunks followed by exactly
//! one terminal `done` or `error`. A record that fails to parse is logged
//! and discarded; it never aborts an otherwise-healthy stream.

use crate::upstream::types::ChatRecord;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::fmt::Display;
use tokio::sync::mpsc;

/// One event observed by the consumer of a streaming request
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// An incremental text fragment
    Chunk { text: String },
    /// Terminal: generation finished, with free-form metadata
    Done { meta: Value },
    /// Terminal: the stream failed
    Error { message: String },
}

impl StreamEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Chunk { .. } => "chunk",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Whether no further events may follow this one
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Chunk { .. })
    }
}

/// The consumer of a stream went away; the relay stops pumping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Destination for relay events.
///
/// Exactly one of `on_done`/`on_error` is invoked per request, always last.
/// Returning `Err(SinkClosed)` cancels the relay cooperatively: it is
/// checked on every delivery, so a departed consumer releases the upstream
/// connection within one read-loop iteration.
#[async_trait]
pub trait EventSink: Send {
    async fn on_chunk(&mut self, text: String) -> Result<(), SinkClosed>;
    async fn on_done(&mut self, meta: Value) -> Result<(), SinkClosed>;
    async fn on_error(&mut self, message: String) -> Result<(), SinkClosed>;

    /// Whether the consumer has already gone away.
    ///
    /// Polled by the relay on every read-loop iteration, so a departed
    /// consumer stops the upstream read even when the incoming records
    /// produce no events.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Sink that forwards events into a bounded mpsc channel.
///
/// Dropping the receiving half closes the channel, which the relay observes
/// as [`SinkClosed`] on its next delivery.
pub struct ChannelSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    async fn send(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        self.tx.send(event).await.map_err(|_| SinkClosed)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn on_chunk(&mut self, text: String) -> Result<(), SinkClosed> {
        self.send(StreamEvent::Chunk { text }).await
    }

    async fn on_done(&mut self, meta: Value) -> Result<(), SinkClosed> {
        self.send(StreamEvent::Done { meta }).await
    }

    async fn on_error(&mut self, message: String) -> Result<(), SinkClosed> {
        self.send(StreamEvent::Error { message }).await
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Reassembles newline-delimited records from arbitrarily split byte chunks.
///
/// Buffering is byte-level, so a multi-byte UTF-8 scalar split across two
/// reads is parsed intact once its line completes. The trailing partial
/// line stays buffered for the next push.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it closes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the newline itself
            lines.push(line);
        }
        lines
    }
}

/// Pump one upstream byte stream into a sink.
///
/// Termination paths, each delivering exactly one terminal event:
/// - a record with `done: true` arrives (remaining upstream bytes are not
///   processed),
/// - the upstream closes without a done flag (`done` is still emitted),
/// - a transport error surfaces mid-stream (`error`),
/// - the sink reports [`SinkClosed`], either on a delivery or via the
///   per-iteration closure check, in which case the consumer is gone and
///   nothing more is delivered.
///
/// Dropping the byte stream on return closes the upstream connection.
pub async fn relay<S, E>(
    mut body: S,
    sink: &mut dyn EventSink,
    done_meta: Value,
) -> Result<(), SinkClosed>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut lines = LineBuffer::new();
    loop {
        // Checked every iteration, not just on delivery: a stream of
        // records that emit no events must still notice a departed
        // consumer.
        if sink.is_closed() {
            return Err(SinkClosed);
        }
        let Some(read) = body.next().await else {
            break;
        };
        let chunk = match read {
            Ok(chunk) => chunk,
            Err(err) => {
                sink.on_error(format!("upstream stream failed: {err}")).await?;
                return Ok(());
            }
        };
        for line in lines.push(&chunk) {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }
            let record: ChatRecord = match serde_json::from_slice(line) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!("discarding malformed upstream record: {err}");
                    continue;
                }
            };
            if let Some(text) = record.content() {
                sink.on_chunk(text.to_string()).await?;
            }
            if record.done {
                sink.on_done(done_meta.clone()).await?;
                return Ok(());
            }
        }
    }
    // Upstream ended without a completion flag; the consumer still gets a
    // terminal event.
    sink.on_done(done_meta).await?;
    Ok(())
}
