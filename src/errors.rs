//! Application error model
//!
//! Defines a typed error hierarchy using `thiserror`. Fatal variants
//! (`AuthenticationFailed`, `LabelNotFound`, `InvalidInput`) end a run; the
//! rest are captured per message by the coordinator and reported in the run
//! summary under their stable [`AppError::code`].

use thiserror::Error;

/// Application error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// No usable credential, or the mail service rejected it
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    /// The configured handled label does not exist in the mailbox
    #[error("label not found: {0}")]
    LabelNotFound(String),
    /// A required header is missing from a fetched message
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    /// Remote resource not found (message, label)
    #[error("not found: {0}")]
    NotFound(String),
    /// Transport call exceeded its deadline
    #[error("operation timed out: {0}")]
    Timeout(String),
    /// Any other transport failure (connection, non-2xx status, bad payload)
    #[error("transport error: {0}")]
    Transport(String),
    /// Invalid configuration or argument
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Internal error (unexpected failure, external crate error)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for `InvalidInput`
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Stable machine-readable code
    ///
    /// Used as the `error_code` field of per-message outcomes in the JSON
    /// run summary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "auth_failed",
            Self::LabelNotFound(_) => "label_not_found",
            Self::MalformedMessage(_) => "malformed_message",
            Self::NotFound(_) => "not_found",
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

/// Type alias for fallible return values
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn codes_are_stable_per_variant() {
        assert_eq!(AppError::AuthenticationFailed(String::new()).code(), "auth_failed");
        assert_eq!(AppError::MalformedMessage(String::new()).code(), "malformed_message");
        assert_eq!(AppError::Timeout(String::new()).code(), "timeout");
        assert_eq!(AppError::Transport(String::new()).code(), "transport");
    }

    #[test]
    fn display_includes_variant_prefix() {
        let err = AppError::LabelNotFound("IMPORTANT".to_owned());
        assert_eq!(err.to_string(), "label not found: IMPORTANT");
        assert_eq!(err.code(), "label_not_found");
    }
}
