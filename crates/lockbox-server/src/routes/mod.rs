//! HTTP route modules for the Lockbox server.
//!
//! - `auth`: login and token rotation
//! - `users`: admin-only provisioning and lookup, self-only key retrieval
//! - `passwords`: tenant-scoped secret CRUD
//! - `health`: liveness probe

pub mod auth;
pub mod health;
pub mod passwords;
pub mod users;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::{get, post};
use axum::{Router, middleware as axum_mw};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::{TOKEN_HEADER, require_token};
use crate::state::AppState;

/// Request bodies larger than this are rejected before deserialization.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Concurrent login attempts allowed; each one runs a password hash.
const LOGIN_CONCURRENCY: usize = 16;

/// Build the complete application router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    // Everything under /api/v1 needs the token header.
    let api = Router::new()
        .route("/user", post(users::create_user))
        .route("/users", get(users::list_users))
        .route("/user/{id}", get(users::get_user))
        .route("/user/key/{username}", get(users::get_user_key))
        .route("/password", post(passwords::create_password))
        .route("/passwords", get(passwords::list_passwords))
        .route(
            "/password/{name}",
            get(passwords::get_password)
                .put(passwords::update_password)
                .delete(passwords::delete_password),
        )
        .route("/token/rotate", post(auth::rotate_token))
        .route_layer(axum_mw::from_fn(require_token));

    let login = Router::new()
        .route("/login", post(auth::login))
        .layer(tower::limit::ConcurrencyLimitLayer::new(LOGIN_CONCURRENCY));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(TOKEN_HEADER)]);

    Router::new()
        .nest("/api/v1", api)
        .merge(login)
        .route("/healthz", get(health::healthz))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("no such route".to_owned())
}
