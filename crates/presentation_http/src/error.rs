//! API error handling
//!
//! Every error leaves the proxy as `{error, details?}` JSON. Upstream
//! rejections keep their original status so the browser client sees the same
//! code the provider sent.

use ai_core::UpstreamError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Wire shape of an error response
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(err) => {
                StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            },
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::BadRequest(_) => None,
            Self::Upstream(err) => err.details().cloned(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::warn!(%status, error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        assert_eq!(
            ApiError::BadRequest("nope".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn upstream_rejection_mirrors_status() {
        let err = ApiError::Upstream(UpstreamError::Rejected {
            status: 429,
            message: "slow down".into(),
            details: Some(serde_json::json!({"type": "rate_limit"})),
        });
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(err.details().is_some());
    }

    #[test]
    fn missing_credential_is_a_local_500() {
        let err = ApiError::Upstream(UpstreamError::MissingCredential);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Missing NVIDIA_API_KEY (or VITE_NVIDIA_API_KEY in ../.env)"
        );
    }

    #[test]
    fn timeout_maps_to_504() {
        let err = ApiError::Upstream(UpstreamError::Timeout(60_000));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
