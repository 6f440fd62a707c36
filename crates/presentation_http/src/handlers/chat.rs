//! Chat proxy handler
//!
//! `POST /api/nvidia/chat` relays one completion to the upstream provider.
//! Buffered requests come back as `{text}`; streaming requests pass the
//! provider's SSE bytes through untouched. Dropping the response body (client
//! disconnect) drops the upstream stream with it.

use ai_core::{ChatRequest as UpstreamRequest, GenerationParams, UpstreamError, WireMessage};
use axum::{
    Json,
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{error::ApiError, state::AppState};

/// Chat proxy request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Single-turn shortcut, used when `messages` is absent
    #[serde(default)]
    pub prompt: Option<String>,
    /// Full message history in the provider's wire format
    #[serde(default)]
    pub messages: Option<Vec<WireMessage>>,
    /// Model override
    #[serde(default)]
    pub model: Option<String>,
    /// Request SSE passthrough instead of a buffered reply
    #[serde(default)]
    pub stream: bool,
    /// Generation parameters; absent fields take their defaults
    #[serde(default)]
    pub params: Option<GenerationParams>,
}

/// Buffered chat response body
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Assistant reply text
    pub text: String,
}

/// Coerce the request into a message list, favouring `messages` over `prompt`
fn resolve_messages(request: &ChatRequest) -> Result<Vec<WireMessage>, ApiError> {
    if let Some(messages) = &request.messages {
        return Ok(messages.clone());
    }
    request
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .map(|prompt| {
            vec![WireMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }]
        })
        .ok_or_else(|| ApiError::BadRequest("Provide either messages[] or prompt".to_string()))
}

/// `POST /api/nvidia/chat`
#[instrument(skip(state, request), fields(stream = request.stream))]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if !state.client.has_credential() {
        return Err(UpstreamError::MissingCredential.into());
    }

    let messages = resolve_messages(&request)?;
    let upstream = UpstreamRequest {
        messages,
        model: request.model,
        params: request.params.unwrap_or_default(),
    };

    if request.stream {
        let bytes = state.client.complete_stream(upstream).await?;
        let headers = [
            (header::CONTENT_TYPE, "text/event-stream; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
        ];
        return Ok((headers, Body::from_stream(bytes)).into_response());
    }

    let text = state.client.complete(upstream).await?;
    Ok(Json(ChatResponse { text }).into_response())
}
