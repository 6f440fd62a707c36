//! Port definitions for the upstream chat client

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use domain::{ChatMessage, Conversation};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

/// A message in the OpenAI-compatible wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }
    }
}

/// Generation parameters forwarded to the provider.
///
/// Defaults are tuned for short spoken replies rather than long-form text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub frequency_penalty: f32,
    #[serde(default)]
    pub presence_penalty: f32,
}

const fn default_max_tokens() -> u32 {
    96
}

const fn default_temperature() -> f32 {
    0.4
}

const fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// A request for one completion
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Ordered turns, system turn first
    pub messages: Vec<WireMessage>,
    /// Model override (config default when None)
    pub model: Option<String>,
    /// Generation parameters
    pub params: GenerationParams,
}

impl ChatRequest {
    /// Build a single-turn request from a bare prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: prompt.into(),
            }],
            model: None,
            params: GenerationParams::default(),
        }
    }

    /// Build a request from a conversation's current window
    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            messages: conversation.messages().iter().map(WireMessage::from).collect(),
            model: None,
            params: GenerationParams::default(),
        }
    }

    /// Set the model for this request
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set generation parameters
    pub const fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// Raw response bytes, relayed without interpretation
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamError>> + Send>>;

/// Parsed token deltas from an event stream
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// Port for chat-completion providers
#[async_trait]
pub trait ChatCompletions: Send + Sync {
    /// Buffered call: one completion string, retried per the client's policy.
    async fn complete(&self, request: ChatRequest) -> Result<String, UpstreamError>;

    /// Streaming call: raw SSE bytes as they arrive. No mid-stream retry;
    /// dropping the stream aborts the upstream request.
    async fn complete_stream(&self, request: ChatRequest) -> Result<ByteStream, UpstreamError>;

    /// Whether a credential is configured
    fn has_credential(&self) -> bool;

    /// Masked credential hint for health reporting
    fn credential_hint(&self) -> Option<String>;
}
