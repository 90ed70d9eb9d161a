//! HTTP error types for the Lockbox server.
//!
//! Maps vault errors into HTTP responses. Every response carries a JSON body
//! with a machine-readable `error` field and a human-readable `message`.
//! Bad credentials and bad tokens produce the same 401 so a caller cannot
//! probe which usernames exist.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lockbox_core::{AuthError, VaultError};

const UNAUTHORIZED_MESSAGE: &str = "invalid credentials or token";

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Login failed, or the token is missing or unknown.
    Unauthorized,
    /// The token is valid but lacks the required role or ownership.
    Forbidden(String),
    /// Requested resource not found.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// A uniqueness conflict.
    Conflict(String),
    /// The storage backend could not serve the request.
    Unavailable(String),
    /// Internal server error. The detail is logged, not returned.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                UNAUTHORIZED_MESSAGE.to_owned(),
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Unavailable(msg) => {
                tracing::warn!(error = %msg, "request failed: storage unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "unavailable",
                    "storage temporarily unavailable".to_owned(),
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Unauthorized => Self::Unauthorized,
            AuthError::Forbidden => Self::Forbidden(err.to_string()),
            AuthError::Storage(_) => VaultError::from(err).into(),
        }
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Auth(inner) => inner.into(),
            VaultError::NotFound { .. } => Self::NotFound(err.to_string()),
            VaultError::Conflict { .. } => Self::Conflict(err.to_string()),
            VaultError::Validation { .. } => Self::BadRequest(err.to_string()),
            VaultError::StorageUnavailable { .. } => Self::Unavailable(err.to_string()),
            VaultError::Internal { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
