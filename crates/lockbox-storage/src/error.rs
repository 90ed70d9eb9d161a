//! Storage error types.
//!
//! Every variant carries the operation or entity it concerns so a log line is
//! enough to diagnose the failure. Raw driver text stays inside `reason` and
//! is never meant to reach an HTTP client.

/// Errors returned by a [`CredentialStore`](crate::CredentialStore).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness constraint rejected the write (duplicate username,
    /// duplicate secret name for the same owner, second key for a user).
    #[error("{entity} already exists")]
    Conflict { entity: &'static str },

    /// A referenced row does not exist (for example a secret owner).
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The store could not be reached or the pool was exhausted.
    #[error("storage connection failed: {reason}")]
    Connection { reason: String },

    /// Creating the schema at startup failed.
    #[error("schema migration failed: {reason}")]
    Schema { reason: String },

    /// A statement failed for a reason other than the ones above.
    #[error("query '{operation}' failed: {reason}")]
    Query {
        operation: &'static str,
        reason: String,
    },

    /// Password hashing or verification could not run.
    #[error("password hashing failed: {reason}")]
    PasswordHash { reason: String },

    /// A stored row could not be mapped back into an entity.
    #[error("corrupt {entity} row: {reason}")]
    Corrupt { entity: &'static str, reason: String },
}
