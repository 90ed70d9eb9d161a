//! Authentication routes: `POST /login`, `POST /api/v1/token/rotate`.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::CallerToken;
use crate::state::AppState;

// ── Request / Response types ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Exchange username and password for the current token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(body) = body?;
    let token = state.vault.login(&body.username, &body.password).await?;
    Ok(Json(TokenResponse { token }))
}

/// Replace the caller's token with a fresh one.
pub async fn rotate_token(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = state.vault.rotate_token(&token).await?;
    Ok(Json(TokenResponse { token }))
}
