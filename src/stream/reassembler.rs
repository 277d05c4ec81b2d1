//! Frame reassembly for the streaming endpoint.
//!
//! The endpoint delivers newline-delimited frames over a chunked HTTP
//! body. Chunk boundaries carry no meaning: a frame may arrive split one
//! byte at a time or coalesced with its neighbors. This reassembler
//! buffers bytes, extracts complete lines, and emits exactly the token
//! deltas a correctly-framed stream would have produced.

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::Stream;
use serde::Deserialize;

use super::endpoint::EndpointError;

/// Fixed prefix of a data frame; anything else on the wire is noise.
pub const DATA_PREFIX: &str = "data: ";

/// Payload of the frame that terminates a turn.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Marker the model emits in raw token text when it starts a tool call.
pub const CALL_MARKER: &str = "<<call>>";

/// Marker the runtime echoes back once a started call reaches execution.
pub const EXECUTE_MARKER: &str = "<<execute>>";

/// How many recent token fragments to retain for the end-of-turn check.
const RECENT_WINDOW: usize = 10;

/// Output of the reassembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    /// One token delta, emitted as soon as its frame is complete.
    Delta(String),
    /// Synthetic end-of-turn signal derived from the sentinel frame.
    Done,
}

/// Reassembles discrete token events from an arbitrary byte stream.
///
/// Wraps an inner byte stream (usually `reqwest`'s body) but the framing
/// core is synchronous: `feed` accepts bytes, `next_event` drains parsed
/// events, so the chop-invariance contract is testable without a runtime.
pub struct FrameReassembler<S> {
    inner: S,
    buffer: Vec<u8>,
    pending: VecDeque<TokenEvent>,
    recent: VecDeque<String>,
    finished: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl<S> FrameReassembler<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            recent: VecDeque::new(),
            finished: false,
        }
    }

    /// Appends raw bytes and extracts any newly completed frames.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.finished {
            return;
        }
        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.handle_line(line.trim_end_matches(['\n', '\r']));
            if self.finished {
                return;
            }
        }
    }

    /// Flushes a trailing partial line once the connection has closed.
    pub fn finish(&mut self) {
        if self.finished || self.buffer.is_empty() {
            return;
        }
        let line: Vec<u8> = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&line);
        self.handle_line(line.trim_end_matches('\r'));
    }

    /// Pops the next fully parsed token event, if any.
    pub fn next_event(&mut self) -> Option<TokenEvent> {
        self.pending.pop_front()
    }

    fn handle_line(&mut self, line: &str) {
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        if payload == DONE_SENTINEL {
            self.finished = true;
            if self.should_emit_done() {
                self.pending.push_back(TokenEvent::Done);
            }
            return;
        }
        match serde_json::from_str::<ChatChunk>(payload) {
            Ok(chunk) => {
                let text = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content);
                if let Some(text) = text {
                    if !text.is_empty() {
                        if self.recent.len() == RECENT_WINDOW {
                            self.recent.pop_front();
                        }
                        self.recent.push_back(text.clone());
                        self.pending.push_back(TokenEvent::Delta(text));
                    }
                }
            }
            Err(err) => {
                // Rare vendor glitches produce unparseable frames; they
                // are dropped, never surfaced.
                tracing::trace!(error = %err, "skipping malformed frame");
            }
        }
    }

    /// End-of-turn heuristic.
    ///
    /// If the tail of the stream started a tool call that never reached
    /// its execute marker, the call was truncated mid-emission and the
    /// synthetic end signal is suppressed so a consumer does not treat
    /// an incomplete invocation as a finished turn.
    fn should_emit_done(&self) -> bool {
        let window: String = self.recent.iter().map(String::as_str).collect();
        match window.rfind(CALL_MARKER) {
            None => true,
            Some(pos) => window[pos + CALL_MARKER.len()..].contains(EXECUTE_MARKER),
        }
    }
}

impl<S, E> Stream for FrameReassembler<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = std::result::Result<TokenEvent, EndpointError>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        let this = self.get_mut();
        loop {
            if let Some(event) = this.next_event() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.finished {
                return Poll::Ready(None);
            }
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.feed(&bytes),
                Poll::Ready(Some(Err(err))) => {
                    return Poll::Ready(Some(Err(EndpointError::disconnect(format!(
                        "stream error: {err}"
                    )))));
                }
                Poll::Ready(None) => {
                    this.finish();
                    this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
