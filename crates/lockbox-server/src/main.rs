//! Lockbox server entry point.
//!
//! Bootstraps the storage backend and the vault, seeds the admin account if
//! configured, then starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use lockbox_core::{AdminBootstrap, Vault};
use lockbox_storage::{CredentialStore, MemoryStore};

use lockbox_server::config::{ServerConfig, StorageKind};
use lockbox_server::hardening;
use lockbox_server::routes;
use lockbox_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    // Runs before logging is initialized, so warnings go to stderr.
    apply_hardening(&config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(storage = storage_label(&config.storage), "Lockbox starting");

    let store = open_store(&config.storage).await?;
    let vault = Vault::new(store);

    if let Some(seed) = &config.admin {
        let outcome = vault
            .bootstrap_admin(&seed.to_new_user())
            .await
            .context("failed to bootstrap admin account")?;
        match outcome {
            AdminBootstrap::Created => {}
            AdminBootstrap::AlreadyAdmin => {
                info!(username = %seed.username, "admin account already present");
            }
            AdminBootstrap::NotAdmin => anyhow::bail!(
                "LOCKBOX_ADMIN_USERNAME '{}' belongs to a user without the admin role",
                seed.username
            ),
        }
    } else {
        warn!("LOCKBOX_ADMIN_PASSWORD not set; no admin account seeded");
    }

    let app = routes::router(Arc::new(AppState::new(vault)));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Lockbox server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Lockbox server stopped");
    Ok(())
}

fn storage_label(kind: &StorageKind) -> &'static str {
    match kind {
        StorageKind::Memory => "memory",
        StorageKind::Postgres { .. } => "postgres",
    }
}

/// Open the configured store. For PostgreSQL the schema is created before
/// this returns; a migration failure aborts startup.
async fn open_store(kind: &StorageKind) -> anyhow::Result<Arc<dyn CredentialStore>> {
    match kind {
        StorageKind::Memory => {
            warn!("using in-memory storage (data will not persist)");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "postgres-backend")]
        StorageKind::Postgres {
            url,
            max_connections,
        } => {
            info!(url = %"[redacted]", max_connections, "using PostgreSQL storage");
            let store = lockbox_storage::PostgresStore::connect(url, *max_connections)
                .await
                .context("failed to connect to PostgreSQL")?;
            store
                .migrate()
                .await
                .context("failed to create database schema")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres-backend"))]
        StorageKind::Postgres { .. } => {
            anyhow::bail!("PostgreSQL storage requested but feature 'postgres-backend' is not enabled");
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}

/// Apply process hardening before logging is initialized.
#[allow(clippy::print_stderr)]
fn apply_hardening(config: &ServerConfig) {
    if let Err(e) = hardening::disable_core_dumps() {
        eprintln!("WARNING: failed to disable core dumps: {e}");
    }

    if config.disable_mlock {
        eprintln!("WARNING: mlock disabled via LOCKBOX_DISABLE_MLOCK; memory may be swapped to disk");
    } else if let Err(e) = hardening::lock_memory() {
        eprintln!("WARNING: failed to lock memory: {e} (set LOCKBOX_DISABLE_MLOCK=true for dev)");
    }
}
