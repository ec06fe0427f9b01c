//! Error types for chatdeck
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Deck Error Enum ==
/// Unified error type for the cache, the session manager and the commands.
///
/// `Clone` so that a single in-flight login can hand the same failure to
/// every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeckError {
    /// No token has been linked yet
    #[error("No token found. Please link your account first.")]
    NotLinked,

    /// The remote service rejected the token
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Serialized payload is larger than the per-entry ceiling
    #[error("Data size ({size} bytes) for '{key}' exceeds cache limit ({limit} bytes)")]
    CacheCapacityExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    /// A stored entry could not be used; only ever logged by the read path
    #[error("Corrupt cache entry: {0}")]
    CacheCorrupt(String),

    /// Transport or remote service failure
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The persisted key-value store failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The connection lacks a capability the command needs
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeckError {
    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            DeckError::NotLinked => "not_linked",
            DeckError::AuthenticationFailed(_) => "authentication_failed",
            DeckError::CacheCapacityExceeded { .. } => "cache_capacity_exceeded",
            DeckError::CacheCorrupt(_) => "cache_corrupt",
            DeckError::NetworkFailure(_) => "network_failure",
            DeckError::Storage(_) => "storage",
            DeckError::NotFound(_) => "not_found",
            DeckError::Unsupported(_) => "unsupported",
            DeckError::InvalidRequest(_) => "invalid_request",
            DeckError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            DeckError::NotLinked => StatusCode::PRECONDITION_REQUIRED,
            DeckError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            DeckError::CacheCapacityExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DeckError::NetworkFailure(_) => StatusCode::BAD_GATEWAY,
            DeckError::NotFound(_) => StatusCode::NOT_FOUND,
            DeckError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            DeckError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DeckError::CacheCorrupt(_) | DeckError::Storage(_) | DeckError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<std::io::Error> for DeckError {
    fn from(err: std::io::Error) -> Self {
        DeckError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for DeckError {
    fn from(err: reqwest::Error) -> Self {
        DeckError::NetworkFailure(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for DeckError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for chatdeck.
pub type Result<T> = std::result::Result<T, DeckError>;
