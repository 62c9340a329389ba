//! Service layer error types
//!
//! Provides a unified error type for all service operations.

use chat_common::AppError;
use chat_core::DomainError;
use std::fmt;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Store or auth failure, or a domain rule violation
    Domain(DomainError),

    /// No session is active
    NotSignedIn,

    /// A pagination fetch is already in flight
    LoadInFlight,

    /// The feed has not received its first page yet, or was closed
    FeedNotLive,

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::NotSignedIn => write!(f, "Not signed in"),
            Self::LoadInFlight => write!(f, "Older messages are already loading"),
            Self::FeedNotLive => write!(f, "Message feed is not live"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code
    pub fn code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::NotSignedIn => "NOT_SIGNED_IN",
            Self::LoadInFlight => "LOAD_IN_FLIGHT",
            Self::FeedNotLive => "FEED_NOT_LIVE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if the same call may succeed later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Domain(e) => e.is_transient(),
            Self::LoadInFlight => true,
            _ => false,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::NotSignedIn => AppError::NotSignedIn,
            ServiceError::LoadInFlight | ServiceError::FeedNotLive => {
                AppError::InvalidInput(err.to_string())
            }
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
