//! Upstream LLM client for Parley
//!
//! HTTP client for NVIDIA's hosted chat-completions API: buffered calls with
//! retry/timeout policy, and streaming calls relayed as raw SSE bytes or
//! parsed token deltas.

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod ports;
pub mod sse;

pub use client::NvidiaClient;
pub use config::UpstreamConfig;
pub use credentials::{key_hint, resolve_api_key};
pub use error::UpstreamError;
pub use ports::{
    ByteStream, ChatCompletions, ChatRequest, DeltaStream, GenerationParams, WireMessage,
};
pub use sse::delta_stream;
