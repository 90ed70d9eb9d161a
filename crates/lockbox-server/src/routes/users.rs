//! User routes under `/api/v1`.
//!
//! Provisioning, listing, and lookup by id are admin-only. Key retrieval is
//! open to any authenticated user, for their own username only.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use lockbox_core::UserView;
use lockbox_storage::{NewUser, Role};

use crate::error::AppError;
use crate::middleware::CallerToken;
use crate::routes::auth::TokenResponse;
use crate::state::AppState;

// ── Request / Response types ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub count: usize,
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub key: String,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Provision a user. Returns the one-time provisioning token.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(body) = body?;
    let new_user = NewUser {
        username: body.username,
        first_name: body.first_name,
        last_name: body.last_name,
        password: body.password,
        role: body.role,
    };
    let token = state.vault.create_user(&token, &new_user).await?;
    Ok(Json(TokenResponse { token }))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
) -> Result<Json<UserListResponse>, AppError> {
    let users = state.vault.list_users(&token).await?;
    Ok(Json(UserListResponse {
        count: users.len(),
        users,
    }))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserView>, AppError> {
    let Path(id) = id?;
    let user = state.vault.get_user(&token, id).await?;
    Ok(Json(user))
}

/// Fetch the caller's own symmetric key, base64-encoded.
pub async fn get_user_key(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
    Path(username): Path<String>,
) -> Result<Json<KeyResponse>, AppError> {
    let key = state.vault.get_user_key(&token, &username).await?;
    Ok(Json(KeyResponse { key }))
}
