//! Upstream client errors

use thiserror::Error;

/// Status classes that are worth retrying on the buffered path
const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Errors surfaced by the upstream chat-completions client
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// DNS/TLS/connection failure (no HTTP status from upstream)
    #[error("Upstream network error calling NVIDIA: {0}")]
    Connection(String),

    /// The request hit its deadline
    #[error("NVIDIA request timed out after {0}ms")]
    Timeout(u64),

    /// Upstream answered with a non-success status
    #[error("{message}")]
    Rejected {
        /// HTTP status returned by the provider
        status: u16,
        /// Message extracted from the provider's error envelope
        message: String,
        /// Raw error envelope, if it parsed as JSON
        details: Option<serde_json::Value>,
    },

    /// Response body did not parse as expected
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Failure while reading an event stream
    #[error("Stream error: {0}")]
    Stream(String),

    /// No credential was configured
    #[error("Missing NVIDIA_API_KEY (or VITE_NVIDIA_API_KEY in ../.env)")]
    MissingCredential,
}

impl UpstreamError {
    /// The HTTP status this error maps to when relayed by the proxy.
    ///
    /// Transport failures map to 502, timeouts to 504, upstream rejections
    /// mirror the upstream status, a missing credential is a local 500.
    pub fn status(&self) -> u16 {
        match self {
            Self::Connection(_) | Self::InvalidResponse(_) | Self::Stream(_) => 502,
            Self::Timeout(_) => 504,
            Self::Rejected { status, .. } => *status,
            Self::MissingCredential => 500,
        }
    }

    /// Whether the buffered path may retry after this error
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) => true,
            Self::Rejected { status, .. } => RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }

    /// The raw error envelope, when upstream sent one
    pub const fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Rejected { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(status: u16) -> UpstreamError {
        UpstreamError::Rejected {
            status,
            message: format!("NVIDIA request failed (HTTP {status})"),
            details: None,
        }
    }

    #[test]
    fn retryable_status_classes() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(rejected(status).is_retryable(), "{status} should retry");
        }
    }

    #[test]
    fn non_retryable_status_classes() {
        for status in [400, 401, 403, 404, 422, 501] {
            assert!(!rejected(status).is_retryable(), "{status} must not retry");
        }
    }

    #[test]
    fn transport_and_timeout_are_retryable() {
        assert!(UpstreamError::Connection("refused".into()).is_retryable());
        assert!(UpstreamError::Timeout(30_000).is_retryable());
    }

    #[test]
    fn missing_credential_is_not_retryable() {
        assert!(!UpstreamError::MissingCredential.is_retryable());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(UpstreamError::Connection("x".into()).status(), 502);
        assert_eq!(UpstreamError::InvalidResponse("bad json".into()).status(), 502);
        assert_eq!(UpstreamError::Timeout(1).status(), 504);
        assert_eq!(rejected(429).status(), 429);
        assert_eq!(UpstreamError::MissingCredential.status(), 500);
    }

    #[test]
    fn timeout_message_carries_deadline() {
        let err = UpstreamError::Timeout(30_000);
        assert_eq!(err.to_string(), "NVIDIA request timed out after 30000ms");
    }
}
