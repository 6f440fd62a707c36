//! Incremental parser for OpenAI-style `text/event-stream` payloads.
//!
//! Frames are newline-delimited `data:` lines; the terminal frame carries
//! the literal `[DONE]`. Partial lines are buffered between chunks.

use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;

use crate::ports::{ByteStream, DeltaStream};

/// One parsed event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A token delta (may be empty for keep-alive frames)
    Delta(String),
    /// The `[DONE]` sentinel
    Done,
}

/// Accumulates raw bytes and yields complete events.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
}

impl FrameParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and drain every complete event it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();
            if payload.is_empty() {
                continue;
            }
            if payload == "[DONE]" {
                events.push(SseEvent::Done);
                continue;
            }
            if let Some(delta) = extract_delta(payload) {
                events.push(SseEvent::Delta(delta));
            }
        }
        events
    }
}

/// Pull the token text out of one data frame. Streaming responses carry it
/// under `choices[0].delta.content`; some providers fall back to a full
/// `choices[0].message.content` on the final frame.
fn extract_delta(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let choice = value.get("choices")?.get(0)?;
    choice
        .get("delta")
        .and_then(|d| d.get("content"))
        .or_else(|| choice.get("message").and_then(|m| m.get("content")))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Turn a raw byte stream into a stream of token deltas, ending at `[DONE]`.
#[must_use]
pub fn delta_stream(bytes: ByteStream) -> DeltaStream {
    let parsed = bytes
        .scan(FrameParser::new(), |parser, chunk| {
            let events: Vec<Result<SseEvent, _>> = match chunk {
                Ok(bytes) => parser.push(&bytes).into_iter().map(Ok).collect(),
                Err(err) => vec![Err(err)],
            };
            futures::future::ready(Some(futures::stream::iter(events)))
        })
        .flatten()
        .take_while(|event| {
            futures::future::ready(!matches!(event, Ok(SseEvent::Done)))
        })
        .filter_map(|event| {
            futures::future::ready(match event {
                Ok(SseEvent::Delta(text)) if !text.is_empty() => Some(Ok(text)),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            })
        });
    Box::pin(parsed)
}

/// Wrap pre-chunked bytes as a [`ByteStream`], mainly for tests and replay.
#[must_use]
pub fn byte_stream_from(chunks: Vec<Bytes>) -> ByteStream {
    Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
}
