//! Server-sent-event framing, both directions
//!
//! [`encode_event`] writes one blank-line-terminated event block; it is the
//! inverse of the relay's record-splitting problem. [`BlockBuffer`] and
//! [`parse_block`] solve the consuming side: reassemble event blocks from
//! arbitrarily split reads and turn them back into [`StreamEvent`]s.
//! [`consume`] drives a full client-side read loop with cooperative
//! cancellation.

use crate::error::{Error, Result};
use crate::relay::StreamEvent;
use crate::types::GenerationRequest;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Delimiter between event blocks
const BLOCK_SEPARATOR: &[u8] = b"\n\n";

/// Encode one event as a `event:`/`data:` block terminated by a blank line.
///
/// Payloads are JSON-encoded, so fragment text with embedded newlines or
/// braces stays on a single `data:` line.
pub fn encode_event(event: &StreamEvent) -> String {
    let data = match event {
        StreamEvent::Chunk { text } => json!({ "text": text }),
        StreamEvent::Done { meta } => meta.clone(),
        StreamEvent::Error { message } => json!({ "error": message }),
    };
    format!("event: {}\ndata: {}\n\n", event.name(), data)
}

/// Reassembles blank-line-terminated event blocks from split byte chunks.
///
/// Mirror of the relay's [`LineBuffer`](crate::relay::LineBuffer) with the
/// block delimiter instead of a single newline.
#[derive(Debug, Default)]
pub struct BlockBuffer {
    buf: Vec<u8>,
}

impl BlockBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete block it closes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut blocks = Vec::new();
        while let Some(pos) = find_separator(&self.buf) {
            let mut block: Vec<u8> = self.buf.drain(..pos + BLOCK_SEPARATOR.len()).collect();
            block.truncate(pos);
            blocks.push(String::from_utf8_lossy(&block).into_owned());
        }
        blocks
    }
}

fn find_separator(buf: &[u8]) -> Option<usize> {
    buf.windows(BLOCK_SEPARATOR.len())
        .position(|window| window == BLOCK_SEPARATOR)
}

/// Parse one complete event block back into a [`StreamEvent`].
///
/// Returns `None` for blocks without a parseable data line or with an
/// unknown event name; the caller skips those.
pub fn parse_block(block: &str) -> Option<StreamEvent> {
    let mut name = None;
    let mut data = None;
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("event: ") {
            name = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix("data: ") {
            data = Some(rest);
        }
    }
    let data: Value = serde_json::from_str(data?).ok()?;
    match name? {
        "chunk" => data
            .get("text")
            .and_then(Value::as_str)
            .map(|text| StreamEvent::Chunk { text: text.to_string() }),
        "done" => Some(StreamEvent::Done { meta: data }),
        "error" => Some(StreamEvent::Error {
            message: data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => None,
    }
}

/// Build the streaming endpoint URL for a request
pub fn stream_url(
    base: &str,
    request: &GenerationRequest,
) -> std::result::Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!(
        "{}/api/feedback/stream",
        base.trim_end_matches('/')
    ))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("message", &request.message);
        if let Some(context) = &request.context {
            query.append_pair("context", context);
        }
        if let Some(tone) = &request.tone {
            query.append_pair("tone", tone);
        }
        if let Some(language) = &request.language {
            query.append_pair("language", language);
        }
    }
    Ok(url)
}

/// Read an SSE response and invoke the callback for each decoded event.
///
/// Returns after a terminal event, end-of-stream, or cancellation; the
/// token is checked on every read-loop iteration, so cancelling releases
/// the connection without waiting for a terminal event.
pub async fn consume<F>(
    client: &reqwest::Client,
    url: Url,
    cancel: CancellationToken,
    mut on_event: F,
) -> Result<()>
where
    F: FnMut(StreamEvent),
{
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(Error::Upstream {
            status: status.as_u16(),
            message,
        });
    }

    let mut body = Box::pin(response.bytes_stream());
    let mut blocks = BlockBuffer::new();
    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            read = body.next() => read,
        };
        match read {
            Some(Ok(chunk)) => {
                for block in blocks.push(&chunk) {
                    if let Some(event) = parse_block(&block) {
                        let terminal = event.is_terminal();
                        on_event(event);
                        if terminal {
                            return Ok(());
                        }
                    }
                }
            }
            Some(Err(err)) => return Err(err.into()),
            None => return Ok(()),
        }
    }
}
