//! Health check handlers

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// Liveness response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Credential probe response. Never carries the full key.
#[derive(Debug, Serialize)]
pub struct NvidiaHealthResponse {
    pub ok: bool,
    #[serde(rename = "hasKey")]
    pub has_key: bool,
    #[serde(rename = "keyHint")]
    pub key_hint: String,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// `GET /health/nvidia`: confirms the backend can read a credential
pub async fn health_nvidia(State(state): State<AppState>) -> Json<NvidiaHealthResponse> {
    Json(NvidiaHealthResponse {
        ok: true,
        has_key: state.client.has_credential(),
        key_hint: state.client.credential_hint().unwrap_or_default(),
    })
}
