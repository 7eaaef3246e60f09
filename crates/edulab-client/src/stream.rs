//! Incremental parsing of the streamed chat response.
//!
//! The chat endpoint answers with a chunked body of newline-delimited frames,
//! each `data: <json>` with a `{"chunk": ...}` or `{"error": ...}` payload,
//! terminated by the sentinel `data: [DONE]`. Network reads split frames at
//! arbitrary byte boundaries, so the parser carries the trailing partial line
//! between reads and only parses complete lines.

use serde::Deserialize;
use tracing::debug;

/// Prefix of every event-stream frame line.
const FRAME_PREFIX: &str = "data:";
/// Payload value that signals end-of-stream.
const DONE_SENTINEL: &str = "[DONE]";

/// Fixed message used when the backend rejects the request as unauthenticated.
pub const MSG_NOT_LOGGED_IN: &str = "Not logged in. Please log in and try again.";
/// Generic message for transport-level failures.
pub const MSG_NETWORK_ERROR: &str = "Network error while contacting the chat service.";

/// One parsed frame of the chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamFrame {
    /// Incremental reply text.
    Chunk(String),
    /// Mid-stream error reported by the provider; the stream may continue.
    Error(String),
    /// End-of-stream sentinel.
    Done,
}

#[derive(Debug, Default, Deserialize)]
struct FramePayload {
    #[serde(default)]
    chunk: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Callbacks invoked while a chat reply streams in.
///
/// Ordering guarantees: chunks are delivered in arrival order, and
/// `on_complete` fires at most once per request, after the last delivered
/// chunk.
pub trait ChatStreamObserver: Send {
    fn on_chunk(&mut self, text: &str);
    fn on_error(&mut self, message: &str);
    fn on_complete(&mut self);
}

/// Incremental event-stream frame parser.
///
/// Bytes are buffered until a full line is available; a multibyte character
/// can never span a line boundary, so splitting on the newline byte is UTF-8
/// safe.
#[derive(Debug, Default)]
pub struct SseFrameParser {
    carry: Vec<u8>,
}

impl SseFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network read and returns every frame completed by it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<ChatStreamFrame> {
        self.carry.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.carry.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = Self::parse_line(line.trim_end()) {
                frames.push(frame);
            }
        }
        frames
    }

    fn parse_line(line: &str) -> Option<ChatStreamFrame> {
        let payload = line.strip_prefix(FRAME_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }
        if payload == DONE_SENTINEL {
            return Some(ChatStreamFrame::Done);
        }
        match serde_json::from_str::<FramePayload>(payload) {
            Ok(FramePayload {
                chunk: Some(chunk), ..
            }) => Some(ChatStreamFrame::Chunk(chunk)),
            Ok(FramePayload {
                error: Some(error), ..
            }) => Some(ChatStreamFrame::Error(error)),
            Ok(_) => None,
            Err(err) => {
                // Tolerate minor protocol noise.
                debug!(error = %err, "skipping malformed stream frame");
                None
            }
        }
    }
}

/// Dispatches parsed frames to the observer.
///
/// Returns `true` once the sentinel was seen; the caller must stop reading
/// immediately and not process further buffered lines.
pub(crate) fn dispatch_frames(
    frames: Vec<ChatStreamFrame>,
    observer: &mut dyn ChatStreamObserver,
) -> bool {
    for frame in frames {
        match frame {
            ChatStreamFrame::Done => {
                observer.on_complete();
                return true;
            }
            ChatStreamFrame::Chunk(text) => observer.on_chunk(&text),
            // A mid-stream error does not terminate the transport stream.
            ChatStreamFrame::Error(message) => observer.on_error(&message),
        }
    }
    false
}
