//! Errors of the session boundary and their HTTP mapping.

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::auth::store::StoreError;

/// Errors produced while resolving, issuing or authorizing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Session token did not resolve. Absorbed by the resolver, which
    /// clears the cookie and continues anonymously.
    TokenInvalid(StoreError),
    /// The identity store failed to mint a token for an authenticated user
    TokenGeneration(StoreError),
    /// The access rule denied the current identity
    Forbidden,
    /// The rule engine itself failed; the cause is kept unchanged
    Store(StoreError),
    /// The request could not be snapshotted for rule evaluation
    RequestInfo(String),
    /// A cookie could not be rendered as a header value
    InvalidCookie(String),
}

impl AuthError {
    /// HTTP status the error maps to when returned from a handler.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TokenInvalid(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RequestInfo(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::TokenGeneration(_) | Self::Store(_) | Self::InvalidCookie(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenInvalid(cause) => write!(f, "Session token rejected: {}", cause),
            Self::TokenGeneration(cause) => {
                write!(f, "Failed to generate new auth token: {}", cause)
            }
            Self::Forbidden => write!(f, "Forbidden"),
            Self::Store(cause) => write!(f, "{}", cause),
            Self::RequestInfo(msg) => write!(f, "Invalid request: {}", msg),
            Self::InvalidCookie(msg) => write!(f, "Invalid cookie: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TokenInvalid(cause) | Self::TokenGeneration(cause) | Self::Store(cause) => {
                Some(cause)
            }
            _ => None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal causes stay in the logs.
        let message = if status.is_server_error() {
            error!("Session request failed: {}", self);
            "Internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
