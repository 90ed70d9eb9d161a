//! Storage gateway for Lockbox.
//!
//! This crate defines the [`CredentialStore`] trait, the narrow query
//! interface the vault core uses to persist users, secrets, and per-user
//! symmetric keys. It knows nothing about admin gating or tokens beyond
//! looking rows up by them.
//!
//! Two implementations are provided:
//!
//! - [`PostgresStore`]: production backend over a `sqlx` connection pool
//!   (feature `postgres-backend`)
//! - [`MemoryStore`]: in-memory, for tests and local development
//!
//! Every query binds its parameters; nothing is assembled by string
//! formatting. Each call owns its own result state, so a store can be shared
//! freely across concurrent requests.

mod error;
mod memory;
mod model;
pub mod password;
#[cfg(feature = "postgres-backend")]
mod postgres;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use model::{KEY_LEN, NewSecret, NewUser, Role, Secret, StoredKey, User};
#[cfg(feature = "postgres-backend")]
pub use postgres::PostgresStore;

/// Relational persistence for users, secrets, and keys.
///
/// "No such row" is `Ok(None)` or an empty `Vec`, never an error, so callers
/// can tell a missing entity apart from a failing store.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Create a user, hashing `user.password` and storing `token` verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the username or token is taken.
    async fn create_user(&self, user: &NewUser, token: &str) -> Result<User, StorageError>;

    /// Create a user and its symmetric key in a single transaction. Either
    /// both rows are written or neither is.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the username or token is taken.
    async fn create_user_with_key(
        &self,
        user: &NewUser,
        token: &str,
        key: &[u8; KEY_LEN],
    ) -> Result<User, StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] or [`StorageError::Query`] if the
    /// lookup itself fails.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] or [`StorageError::Query`] if the
    /// lookup itself fails.
    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] or [`StorageError::Query`] if the
    /// lookup itself fails.
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError>;

    /// Check `password` against the stored hash for `username` and return the
    /// user's current token on a match. Unknown usernames and wrong passwords
    /// both yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PasswordHash`] or [`StorageError::Corrupt`] if
    /// verification cannot run, or a connection/query error.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, StorageError>;

    /// Replace a user's token. Returns `false` if no such user exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the new token collides.
    async fn update_token(&self, user_id: i64, token: &str) -> Result<bool, StorageError>;

    /// All users ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a connection/query error on failure.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] on a duplicate `(name, owner)` and
    /// [`StorageError::NotFound`] if the owner does not exist.
    async fn create_secret(
        &self,
        secret: &NewSecret,
        owner_id: i64,
    ) -> Result<Secret, StorageError>;

    /// Look up a secret by name, scoped to the owner holding `token`.
    ///
    /// # Errors
    ///
    /// Returns a connection/query error on failure.
    async fn find_secret_by_name_and_owner_token(
        &self,
        name: &str,
        token: &str,
    ) -> Result<Option<Secret>, StorageError>;

    /// All secrets of the owner holding `token`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a connection/query error on failure.
    async fn list_secrets_by_owner_token(&self, token: &str)
    -> Result<Vec<Secret>, StorageError>;

    /// Replace the login username and value of an owner's secret. Returns
    /// `None` if the owner has no secret with that name.
    ///
    /// # Errors
    ///
    /// Returns a connection/query error on failure.
    async fn update_secret(
        &self,
        secret: &NewSecret,
        owner_id: i64,
    ) -> Result<Option<Secret>, StorageError>;

    /// Delete an owner's secret. Returns `false` if nothing was deleted.
    ///
    /// # Errors
    ///
    /// Returns a connection/query error on failure.
    async fn delete_secret(&self, name: &str, owner_id: i64) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the owner already has a key and
    /// [`StorageError::NotFound`] if the owner does not exist.
    async fn create_key(&self, key: &[u8; KEY_LEN], owner_id: i64) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError::Corrupt`] if the stored key has the wrong
    /// width, or a connection/query error.
    async fn find_key_by_owner_id(&self, owner_id: i64)
    -> Result<Option<StoredKey>, StorageError>;
}
