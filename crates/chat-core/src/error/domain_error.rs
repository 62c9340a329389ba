//! Domain errors - error types for the domain layer

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Message text is empty")]
    EmptyMessage,

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "EMPTY_MESSAGE",
            Self::InvalidDocument(_) => "INVALID_DOCUMENT",
            Self::SignInFailed(_) => "SIGN_IN_FAILED",
            Self::Unavailable(_) => "BACKEND_UNAVAILABLE",
            Self::StoreError(_) => "STORE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyMessage | Self::InvalidDocument(_))
    }

    /// Check if this is an authentication error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::SignInFailed(_))
    }

    /// Check if retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}
