//! Error types for the sync server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use booksync_core::{DeltaError, StoreError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Why a request was refused by the authentication gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Neither a bearer header nor a session cookie was supplied.
    MissingCredential,
    /// A credential was supplied but did not verify.
    InvalidCredential,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::MissingCredential => f.write_str("missing credential"),
            AuthFailure::InvalidCredential => f.write_str("invalid or expired credential"),
        }
    }
}

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The `date` query parameter is absent or empty.
    #[error("missing 'date' parameter")]
    MissingParameter,

    /// The `date` query parameter does not parse.
    #[error("invalid date format: {0}")]
    InvalidFormat(String),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(AuthFailure),

    /// Record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DeltaError> for ServerError {
    fn from(err: DeltaError) -> Self {
        match err {
            DeltaError::MissingParameter => ServerError::MissingParameter,
            DeltaError::InvalidFormat(e) => ServerError::InvalidFormat(e.to_string()),
            DeltaError::Store(e) => ServerError::Store(e),
        }
    }
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::MissingParameter
                | ServerError::InvalidFormat(_)
                | ServerError::Unauthorized(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_)
        )
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::MissingParameter | ServerError::InvalidFormat(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Fixed message safe to show to callers. Never includes error detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            ServerError::MissingParameter => "Missing 'date' parameter.",
            ServerError::InvalidFormat(_) => "Invalid date format.",
            ServerError::Unauthorized(AuthFailure::MissingCredential) => {
                "Unauthorized: missing credential."
            }
            ServerError::Unauthorized(AuthFailure::InvalidCredential) => {
                "Unauthorized: invalid or expired credential."
            }
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_) => {
                "Internal server error."
            }
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Fixed, non-leaking description.
    pub error: &'static str,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}
