//! Login handler
//!
//! Username-only acknowledgement. Authentication proper lives on the client
//! side of this deployment, so the backend just validates presence.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
}

/// Login response body
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /login`
pub async fn login(Json(request): Json<LoginRequest>) -> impl IntoResponse {
    let username = request
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    match username {
        Some(username) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                username: Some(username.to_string()),
                error: None,
            }),
        ),
        None => (
            StatusCode::BAD_REQUEST,
            Json(LoginResponse {
                success: false,
                username: None,
                error: Some("Username is required".to_string()),
            }),
        ),
    }
}
