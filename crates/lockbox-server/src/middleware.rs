//! Token extraction middleware.
//!
//! Reads the `X-Lockbox-Token` header on protected routes and hands it to
//! handlers as a [`CallerToken`] extension. A missing or non-ASCII header is
//! rejected here; whether the token belongs to anyone is decided by the vault
//! inside each operation, against the current state of the store.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// Name of the bearer token header.
pub const TOKEN_HEADER: &str = "x-lockbox-token";

/// The raw token presented by the caller.
#[derive(Clone)]
pub struct CallerToken(pub String);

impl std::fmt::Debug for CallerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CallerToken([REDACTED])")
    }
}

/// Require the token header and stash it in the request extensions.
pub async fn require_token(mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);

    let Some(token) = token else {
        tracing::debug!(path = %req.uri().path(), "request without token header");
        return AppError::Unauthorized.into_response();
    };

    req.extensions_mut().insert(CallerToken(token));
    next.run(req).await
}
