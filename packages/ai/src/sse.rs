// ABOUTME: Incremental decoder for Server-Sent-Events framed response bodies
// ABOUTME: Buffers partial lines and partial JSON payloads across read chunks

use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use tracing::trace;

use crate::error::ClientError;

/// Event name used when a block carries no `event:` line
pub const DEFAULT_EVENT: &str = "message";

/// One decoded event: its name and parsed JSON payload
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: Value,
}

/// Output of the decoder
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    Event(SseEvent),
    /// `data:` payload that never became valid JSON before its block ended.
    /// `truncated` is set when the block was cut off by the end of the stream.
    Unparsed {
        event: String,
        data: String,
        truncated: bool,
    },
}

/// Line-oriented SSE decoder.
///
/// Bytes are buffered until a full line (`\n` or `\r\n`) is available, so a
/// chunk may end anywhere, including inside a UTF-8 sequence. A `data:` line
/// whose JSON does not parse is kept pending; later `data:` lines of the same
/// block are appended and parsing is retried.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    pending: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every frame completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            self.process_line(&line, &mut frames);
        }
        frames
    }

    /// Flush at end of stream: an unterminated last line is processed as if
    /// complete, and a still-unparseable payload comes back as `Unparsed`.
    pub fn finish(&mut self) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            self.process_line(line, &mut frames);
        }
        self.flush_pending(&mut frames, true);
        self.event = None;
        frames
    }

    /// True when the decoder holds no partial line or payload
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty() && self.pending.is_none()
    }

    fn process_line(&mut self, line: &str, frames: &mut Vec<SseFrame>) {
        // Blank line ends the block
        if line.is_empty() {
            self.flush_pending(frames, false);
            self.event = None;
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => {
                self.flush_pending(frames, false);
                self.event = Some(value.to_string());
            }
            "data" => {
                let payload = match self.pending.take() {
                    Some(mut pending) => {
                        pending.push('\n');
                        pending.push_str(value);
                        pending
                    }
                    None => value.to_string(),
                };
                match serde_json::from_str::<Value>(&payload) {
                    Ok(data) => frames.push(SseFrame::Event(SseEvent {
                        event: self.current_event().to_string(),
                        data,
                    })),
                    Err(_) => {
                        // Not enough data yet
                        trace!(len = payload.len(), "Holding partial SSE payload");
                        self.pending = Some(payload);
                    }
                }
            }
            _ => {}
        }
    }

    fn flush_pending(&mut self, frames: &mut Vec<SseFrame>, truncated: bool) {
        if let Some(data) = self.pending.take() {
            frames.push(SseFrame::Unparsed {
                event: self.current_event().to_string(),
                data,
                truncated,
            });
        }
    }

    fn current_event(&self) -> &str {
        self.event.as_deref().unwrap_or(DEFAULT_EVENT)
    }
}

/// Adapt a byte stream into a stream of decoded frames
pub fn decode_stream<S, B, E>(byte_stream: S) -> impl Stream<Item = Result<SseFrame, ClientError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    ClientError: From<E>,
{
    async_stream::stream! {
        let mut byte_stream = std::pin::pin!(byte_stream);
        let mut decoder = SseDecoder::new();

        while let Some(chunk_result) = byte_stream.next().await {
            match chunk_result {
                Ok(bytes) => {
                    for frame in decoder.feed(bytes.as_ref()) {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    yield Err(ClientError::from(e));
                    return;
                }
            }
        }

        for frame in decoder.finish() {
            yield Ok(frame);
        }
    }
}
