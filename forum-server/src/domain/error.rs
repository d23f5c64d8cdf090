use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum DomainError {
    #[error("validation failed for '{field}': {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("invalid filter '{field}': expected RFC3339 timestamp")]
    InvalidFilter { field: &'static str },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("verification code does not match")]
    CodeMismatch,

    #[error("verification code expired or absent")]
    CodeExpiredOrAbsent,

    #[error("user not found")]
    UserNotFound,

    /// Storage or another collaborator failed; callers may retry.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("unexpected domain error: {0}")]
    Unexpected(String),
}
