//! Server-sent event frame decoding.
//!
//! A streamed provider response is a sequence of `data: <json>` lines
//! terminated by `data: [DONE]` or end of body. Lines may be split across
//! network chunks at any byte, including inside a multi-byte character.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::debug;

use super::error::{GatewayError, Result};

/// Decoded JSON payloads of a streamed response.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One event produced by the frame decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// A `data:` line whose payload parsed as JSON.
    Payload(Value),
    /// The `[DONE]` sentinel.
    Done,
}

/// Incremental line decoder for `text/event-stream` bodies.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<FrameEvent> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = self.decode_line(&line[..line.len() - 1]) {
                events.push(event);
            }
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        events
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<FrameEvent> {
        if self.done || self.buffer.is_empty() {
            return Vec::new();
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line).into_iter().collect()
    }

    /// Returns true once the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<FrameEvent> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, len = raw.len(), "Skipping non-UTF-8 stream line");
                return None;
            }
        };

        // Blank lines separate events; `:` lines are comments.
        if line.is_empty() || line.starts_with(':') {
            return None;
        }
        let payload = line.strip_prefix(DATA_PREFIX)?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload).trim_end();

        if payload == DONE_SENTINEL {
            self.done = true;
            return Some(FrameEvent::Done);
        }

        match serde_json::from_str(payload) {
            Ok(value) => Some(FrameEvent::Payload(value)),
            Err(e) => {
                debug!(
                    error = %e,
                    payload_len = payload.len(),
                    "Skipping unparseable stream frame"
                );
                None
            }
        }
    }
}

/// Decodes a byte stream into JSON frame payloads.
///
/// The returned stream ends at `[DONE]` or at end of body. A transport error
/// while reading ends it with [`GatewayError::StreamDecodeError`].
pub fn decode_frames<S, B, E>(body: S) -> FrameStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Display,
{
    struct State<S> {
        body: Pin<Box<S>>,
        decoder: FrameDecoder,
        pending: VecDeque<FrameEvent>,
        exhausted: bool,
    }

    let state = State {
        body: Box::pin(body),
        decoder: FrameDecoder::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            match state.pending.pop_front() {
                Some(FrameEvent::Payload(value)) => return Some((Ok(value), state)),
                Some(FrameEvent::Done) => return None,
                None if state.exhausted => return None,
                None => {}
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    return Some((Err(GatewayError::StreamDecodeError(e.to_string())), state));
                }
                None => {
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                    state.exhausted = true;
                }
            }
        }
    }))
}
