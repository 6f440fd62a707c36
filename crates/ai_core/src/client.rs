//! Reqwest-backed client for the NVIDIA chat-completions API

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use rand::Rng;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::config::UpstreamConfig;
use crate::credentials::key_hint;
use crate::error::UpstreamError;
use crate::ports::{ByteStream, ChatCompletions, ChatRequest};

/// Retries on token-capped requests are limited to short replies so a
/// degraded upstream still answers quickly.
const RETRY_MAX_TOKENS_CAP: u32 = 64;

/// Base backoff between attempts, before jitter
const BACKOFF_BASE_MS: u64 = 400;

/// Jitter range added to the base backoff
const BACKOFF_JITTER_MS: u64 = 500;

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Buffered calls retry transient failures with a jittered backoff;
/// streaming calls hand back the raw byte stream after the status check
/// and never retry mid-stream.
pub struct NvidiaClient {
    http: reqwest::Client,
    config: UpstreamConfig,
    api_key: Option<SecretString>,
}

impl NvidiaClient {
    /// Build a client over the given config and optional credential.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Connection`] if the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: UpstreamConfig,
        api_key: Option<SecretString>,
    ) -> Result<Self, UpstreamError> {
        // No global timeout: per-attempt timeouts are applied below, and a
        // global one would cut long event streams short.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| UpstreamError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    fn bearer(&self) -> Result<&str, UpstreamError> {
        self.api_key
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .ok_or(UpstreamError::MissingCredential)
    }

    fn body(&self, request: &ChatRequest, stream: bool, max_tokens: u32) -> Value {
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);
        json!({
            "model": model,
            "messages": request.messages,
            "max_tokens": max_tokens,
            "temperature": request.params.temperature,
            "top_p": request.params.top_p,
            "frequency_penalty": request.params.frequency_penalty,
            "presence_penalty": request.params.presence_penalty,
            "stream": stream,
        })
    }

    async fn send_once(
        &self,
        request: &ChatRequest,
        attempt: u32,
    ) -> Result<String, UpstreamError> {
        // Later attempts cap the reply length so a struggling upstream can
        // still finish inside the window.
        let max_tokens = if attempt == 1 {
            request.params.max_tokens
        } else {
            request.params.max_tokens.min(RETRY_MAX_TOKENS_CAP)
        };
        let timeout_ms = self.config.timeout_for_attempt(attempt);

        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(self.bearer()?)
            .timeout(Duration::from_millis(timeout_ms))
            .json(&self.body(request, false, max_tokens))
            .send()
            .await
            .map_err(|e| classify_transport(&e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(status, response.json::<Value>().await.ok()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;
        extract_text(&payload)
            .ok_or_else(|| UpstreamError::InvalidResponse("no reply content".to_string()))
    }
}

#[async_trait]
impl ChatCompletions for NvidiaClient {
    #[instrument(skip_all, fields(model = request.model.as_deref()))]
    async fn complete(&self, request: ChatRequest) -> Result<String, UpstreamError> {
        let attempts = self.config.retry_attempts.max(1);
        let mut last_error = UpstreamError::InvalidResponse("no attempt made".to_string());

        for attempt in 1..=attempts {
            match self.send_once(&request, attempt).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let backoff =
                        BACKOFF_BASE_MS + rand::rng().random_range(0..BACKOFF_JITTER_MS);
                    warn!(attempt, backoff_ms = backoff, error = %err, "retrying completion");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    last_error = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_error)
    }

    #[instrument(skip_all, fields(model = request.model.as_deref()))]
    async fn complete_stream(&self, request: ChatRequest) -> Result<ByteStream, UpstreamError> {
        let timeout_ms = self.config.stream_timeout_ms;
        let send = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(self.bearer()?)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&self.body(&request, true, request.params.max_tokens))
            .send();

        // The timeout bounds connection and response headers only; once the
        // stream is open, bytes flow until the upstream closes it.
        let response = tokio::time::timeout(Duration::from_millis(timeout_ms), send)
            .await
            .map_err(|_| UpstreamError::Timeout(timeout_ms))?
            .map_err(|e| classify_transport(&e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(status, response.json::<Value>().await.ok()));
        }

        debug!("event stream open");
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| UpstreamError::Stream(e.to_string())));
        Ok(Box::pin(bytes))
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn credential_hint(&self) -> Option<String> {
        self.api_key.as_ref().map(key_hint)
    }
}

fn classify_transport(error: &reqwest::Error, timeout_ms: u64) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Timeout(timeout_ms)
    } else {
        UpstreamError::Connection(error.to_string())
    }
}

/// Map a non-2xx response to a rejection, pulling the provider's own
/// message out of its error envelope when one is present.
fn rejection(status: StatusCode, details: Option<Value>) -> UpstreamError {
    let message = details
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
        })
        .map_or_else(
            || format!("NVIDIA request failed (HTTP {})", status.as_u16()),
            ToString::to_string,
        );
    UpstreamError::Rejected {
        status: status.as_u16(),
        message,
        details,
    }
}

fn extract_text(payload: &Value) -> Option<String> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
