//! HTTP client for the Edulab backend.
//!
//! One [`ApiClient`] covers every REST endpoint plus the streamed chat
//! response; [`stream`] holds the incremental event-stream parser.

mod client;
pub mod stream;
pub mod types;

pub use client::ApiClient;
pub use stream::{ChatStreamFrame, ChatStreamObserver, SseFrameParser};
