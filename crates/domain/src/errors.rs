//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Invalid user name (empty or unusable after cleaning)
    #[error("Invalid user name: {0}")]
    InvalidUserName(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Operation not permitted
    #[error("Operation not permitted: {0}")]
    NotPermitted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_user_name_error_message() {
        let err = DomainError::InvalidUserName("???".to_string());
        assert_eq!(err.to_string(), "Invalid user name: ???");
    }

    #[test]
    fn validation_error_message() {
        let err = DomainError::ValidationError("empty utterance".to_string());
        assert_eq!(err.to_string(), "Validation failed: empty utterance");
    }
}
