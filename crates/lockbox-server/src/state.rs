//! Shared application state for the Lockbox server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds no user data: the vault reads the store
//! on every request.

use lockbox_core::Vault;

/// Shared application state passed to all HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Token-authenticated access to users, secrets, and keys.
    pub vault: Vault,
}

impl AppState {
    #[must_use]
    pub fn new(vault: Vault) -> Self {
        Self { vault }
    }
}
