//! Secret routes under `/api/v1`, always scoped to the caller.
//!
//! Paths:
//! - `POST   /api/v1/password`: store
//! - `GET    /api/v1/passwords`: list
//! - `GET    /api/v1/password/{name}`: read
//! - `PUT    /api/v1/password/{name}`: replace username and value
//! - `DELETE /api/v1/password/{name}`: delete

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use lockbox_core::SecretView;
use lockbox_storage::NewSecret;

use crate::error::AppError;
use crate::middleware::CallerToken;
use crate::state::AppState;

// ── Request / Response types ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreatePasswordRequest {
    pub name: String,
    #[serde(default)]
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordListResponse {
    pub count: usize,
    pub passwords: Vec<SecretView>,
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn create_password(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
    body: Result<Json<CreatePasswordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let Json(body) = body?;
    let secret = NewSecret {
        name: body.name,
        login_username: body.username,
        value: body.password,
    };
    let created = state.vault.create_secret(&token, &secret).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: created.id,
            name: created.name,
        }),
    ))
}

pub async fn get_password(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
    Path(name): Path<String>,
) -> Result<Json<SecretView>, AppError> {
    let secret = state.vault.get_secret(&token, &name).await?;
    Ok(Json(secret))
}

pub async fn list_passwords(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
) -> Result<Json<PasswordListResponse>, AppError> {
    let passwords = state.vault.list_secrets(&token).await?;
    Ok(Json(PasswordListResponse {
        count: passwords.len(),
        passwords,
    }))
}

pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
    Path(name): Path<String>,
    body: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Result<Json<SecretView>, AppError> {
    let Json(body) = body?;
    let secret = NewSecret {
        name,
        login_username: body.username,
        value: body.password,
    };
    let updated = state.vault.update_secret(&token, &secret).await?;
    Ok(Json(updated))
}

pub async fn delete_password(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.vault.delete_secret(&token, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
