//! Lockbox HTTP server.
//!
//! Wires the vault core and a storage backend into an Axum server. The JSON
//! API lives under `/api/v1/*`, with `POST /login` and `GET /healthz` left
//! unauthenticated. Clients present their token in the `X-Lockbox-Token`
//! header.

pub mod config;
pub mod error;
pub mod hardening;
pub mod middleware;
pub mod routes;
pub mod state;
