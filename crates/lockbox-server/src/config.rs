//! Server configuration for Lockbox.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `LOCKBOX_*` environment variables.

use std::fmt;
use std::net::SocketAddr;

use lockbox_storage::{NewUser, Role};

const DEFAULT_PORT: u16 = 8080;

/// PostgreSQL when compiled in. The in-memory store is an explicit opt-in.
#[cfg(feature = "postgres-backend")]
const DEFAULT_STORAGE: &str = "postgres";
#[cfg(not(feature = "postgres-backend"))]
const DEFAULT_STORAGE: &str = "memory";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage: StorageKind,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Whether to skip `mlock` (for development without root/`CAP_IPC_LOCK`).
    pub disable_mlock: bool,
    /// Admin account seeded at startup. `None` when no password is set.
    pub admin: Option<AdminSeed>,
}

/// Supported storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    /// In-memory (development only, data lost on restart). All tenants share
    /// one lock, so only selected when `LOCKBOX_STORAGE=memory`.
    Memory,
    /// PostgreSQL.
    Postgres { url: String, max_connections: u32 },
}

/// Bootstrap admin account.
#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl AdminSeed {
    #[must_use]
    pub fn to_new_user(&self) -> NewUser {
        NewUser {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            password: self.password.clone(),
            role: Role::Admin,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `LOCKBOX_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:8080`)
    /// - `LOCKBOX_STORAGE`: `postgres` or `memory` (default: `postgres` when the
    ///   `postgres-backend` feature is enabled, else `memory`)
    /// - `DATABASE_URL`: PostgreSQL connection string (default: `postgres://localhost/lockbox`)
    /// - `LOCKBOX_DB_MAX_CONNECTIONS`: pool size (default: `10`)
    /// - `LOCKBOX_LOG_LEVEL`: log filter (default: `info`)
    /// - `LOCKBOX_DISABLE_MLOCK`: skip `mlockall` for dev environments (default: `false`)
    /// - `LOCKBOX_ADMIN_USERNAME`, `LOCKBOX_ADMIN_FIRST_NAME`,
    ///   `LOCKBOX_ADMIN_LAST_NAME`: bootstrap admin identity (default: `admin`)
    /// - `LOCKBOX_ADMIN_PASSWORD`: bootstrap admin password; no admin is
    ///   seeded when unset
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        // Priority: LOCKBOX_BIND_ADDR > PORT > default 127.0.0.1:8080
        let bind_addr = if let Some(addr) = var("LOCKBOX_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
        } else if let Some(port_str) = var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
        };

        let storage_name = var("LOCKBOX_STORAGE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_STORAGE.to_owned())
            .to_lowercase();
        let storage = if storage_name == "memory" {
            StorageKind::Memory
        } else {
            StorageKind::Postgres {
                url: var("DATABASE_URL")
                    .unwrap_or_else(|| "postgres://localhost/lockbox".to_owned()),
                max_connections: var("LOCKBOX_DB_MAX_CONNECTIONS")
                    .and_then(|v| v.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(10),
            }
        };

        let log_level = var("LOCKBOX_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let disable_mlock = var("LOCKBOX_DISABLE_MLOCK").is_some_and(|v| v == "true" || v == "1");

        let admin = var("LOCKBOX_ADMIN_PASSWORD")
            .filter(|p| !p.is_empty())
            .map(|password| AdminSeed {
                username: var("LOCKBOX_ADMIN_USERNAME").unwrap_or_else(|| "admin".to_owned()),
                first_name: var("LOCKBOX_ADMIN_FIRST_NAME").unwrap_or_else(|| "admin".to_owned()),
                last_name: var("LOCKBOX_ADMIN_LAST_NAME").unwrap_or_else(|| "admin".to_owned()),
                password,
            });

        Self {
            bind_addr,
            storage,
            log_level,
            disable_mlock,
            admin,
        }
    }
}
