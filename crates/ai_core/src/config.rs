//! Configuration for the upstream chat-completions client

use serde::{Deserialize, Serialize};

/// Configuration for the NVIDIA chat-completions client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the chat-completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model to use when the caller names none
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Timeout for the first buffered attempt, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Floor for the extended timeout applied to retry attempts
    #[serde(default = "default_retry_timeout_floor_ms")]
    pub retry_timeout_floor_ms: u64,

    /// Timeout for establishing a streaming response, in milliseconds.
    /// Body read is unbounded; the stream ends on `[DONE]` or disconnect.
    #[serde(default = "default_stream_timeout_ms")]
    pub stream_timeout_ms: u64,

    /// Total buffered attempts (1 = no retry)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

fn default_base_url() -> String {
    "https://integrate.api.nvidia.com/v1".to_string()
}

fn default_model() -> String {
    "meta/llama-4-maverick-17b-128e-instruct".to_string()
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_retry_timeout_floor_ms() -> u64 {
    45_000
}

const fn default_stream_timeout_ms() -> u64 {
    60_000
}

const fn default_retry_attempts() -> u32 {
    2
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_model: default_model(),
            timeout_ms: default_timeout_ms(),
            retry_timeout_floor_ms: default_retry_timeout_floor_ms(),
            stream_timeout_ms: default_stream_timeout_ms(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

impl UpstreamConfig {
    /// URL of the chat-completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Timeout for a given 1-indexed attempt. Retries get a longer deadline
    /// so a slow-but-alive upstream can still answer.
    pub fn timeout_for_attempt(&self, attempt: u32) -> u64 {
        if attempt <= 1 {
            self.timeout_ms
        } else {
            self.timeout_ms.max(self.retry_timeout_floor_ms)
        }
    }
}
