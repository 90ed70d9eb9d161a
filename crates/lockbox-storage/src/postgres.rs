//! PostgreSQL storage backend.
//!
//! Three tables: `users`, `secrets`, `keys`. Uniqueness and ownership are
//! enforced by constraints, so concurrent writers cannot slip past a
//! check-then-insert race; the resulting SQLSTATE is mapped back into
//! [`StorageError::Conflict`] or [`StorageError::NotFound`].
//!
//! Feature-gated behind `postgres-backend`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use zeroize::Zeroizing;

use crate::model::{KEY_LEN, NewSecret, NewUser, Role, Secret, StoredKey, User};
use crate::password::{hash_blocking, verify_blocking};
use crate::{CredentialStore, StorageError};

const SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS users (
        id            BIGSERIAL   PRIMARY KEY,
        username      TEXT        NOT NULL UNIQUE,
        first_name    TEXT        NOT NULL,
        last_name     TEXT        NOT NULL,
        password_hash TEXT        NOT NULL,
        role          TEXT        NOT NULL DEFAULT 'standard',
        token         TEXT        NOT NULL UNIQUE,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    r"CREATE TABLE IF NOT EXISTS secrets (
        id             BIGSERIAL   PRIMARY KEY,
        name           TEXT        NOT NULL,
        login_username TEXT        NOT NULL,
        secret_value   TEXT        NOT NULL,
        user_id        BIGINT      NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (name, user_id)
    )",
    r"CREATE TABLE IF NOT EXISTS keys (
        id        BIGSERIAL PRIMARY KEY,
        key_bytes BYTEA     NOT NULL,
        user_id   BIGINT    NOT NULL UNIQUE REFERENCES users (id) ON DELETE CASCADE
    )",
];

const USER_COLUMNS: &str = "id, username, first_name, last_name, role, token, created_at";
const SECRET_COLUMNS: &str =
    "s.id, s.name, s.login_username, s.secret_value, s.user_id, s.created_at, s.updated_at";

// ── Row mapping ──────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct RawUser {
    id: i64,
    username: String,
    first_name: String,
    last_name: String,
    role: String,
    token: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RawUser> for User {
    type Error = StorageError;

    fn try_from(raw: RawUser) -> Result<Self, Self::Error> {
        let role = raw
            .role
            .parse::<Role>()
            .map_err(|reason| StorageError::Corrupt {
                entity: "user",
                reason,
            })?;
        Ok(Self {
            id: raw.id,
            username: raw.username,
            first_name: raw.first_name,
            last_name: raw.last_name,
            role,
            token: raw.token,
            created_at: raw.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RawSecret {
    id: i64,
    name: String,
    login_username: String,
    secret_value: String,
    user_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RawSecret> for Secret {
    fn from(raw: RawSecret) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            login_username: raw.login_username,
            value: raw.secret_value,
            owner_id: raw.user_id,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RawKey {
    id: i64,
    key_bytes: Vec<u8>,
    user_id: i64,
}

impl TryFrom<RawKey> for StoredKey {
    type Error = StorageError;

    fn try_from(raw: RawKey) -> Result<Self, Self::Error> {
        let bytes = Zeroizing::new(raw.key_bytes);
        let key: [u8; KEY_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| StorageError::Corrupt {
                    entity: "key",
                    reason: format!("expected {KEY_LEN} bytes, found {}", bytes.len()),
                })?;
        Ok(Self {
            id: raw.id,
            owner_id: raw.user_id,
            key: Zeroizing::new(key),
        })
    }
}

/// Translate a driver error. Constraint violations become domain errors,
/// pool and transport failures become [`StorageError::Connection`].
fn map_sqlx(operation: &'static str, entity: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |err| match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => StorageError::Conflict { entity },
            // foreign_key_violation
            Some("23503") => StorageError::NotFound { entity: "user" },
            _ => StorageError::Query {
                operation,
                reason: db_err.to_string(),
            },
        },
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Connection {
            reason: err.to_string(),
        },
        _ => StorageError::Query {
            operation,
            reason: err.to_string(),
        },
    }
}

/// A [`CredentialStore`] backed by PostgreSQL.
///
/// Cloning is cheap; clones share the pool.
///
/// # Examples
///
/// ```no_run
/// # use lockbox_storage::PostgresStore;
/// # #[tokio::main]
/// # async fn main() -> Result<(), lockbox_storage::StorageError> {
/// let store = PostgresStore::connect("postgres://localhost/lockbox", 10).await?;
/// store.migrate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresStore {
    /// Open a connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the database is unreachable or
    /// the URL is malformed.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connection {
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the tables if they do not exist. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Schema`] if any statement fails.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Schema {
                    reason: e.to_string(),
                })?;
        }
        tracing::debug!("storage schema ready");
        Ok(())
    }

    /// Return a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl CredentialStore for PostgresStore {
    async fn create_user(&self, user: &NewUser, token: &str) -> Result<User, StorageError> {
        let hash = hash_blocking(&user.password).await?;
        let raw = sqlx::query_as::<_, RawUser>(&format!(
            "INSERT INTO users (username, first_name, last_name, password_hash, role, token) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&hash)
        .bind(user.role.as_str())
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx("create_user", "user"))?;
        raw.try_into()
    }

    async fn create_user_with_key(
        &self,
        user: &NewUser,
        token: &str,
        key: &[u8; KEY_LEN],
    ) -> Result<User, StorageError> {
        let hash = hash_blocking(&user.password).await?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(map_sqlx("begin", "user"))?;

        let raw = sqlx::query_as::<_, RawUser>(&format!(
            "INSERT INTO users (username, first_name, last_name, password_hash, role, token) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&hash)
        .bind(user.role.as_str())
        .bind(token)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx("create_user", "user"))?;

        sqlx::query("INSERT INTO keys (key_bytes, user_id) VALUES ($1, $2)")
            .bind(key.as_slice())
            .bind(raw.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx("create_key", "key"))?;

        tx.commit().await.map_err(map_sqlx("commit", "user"))?;
        raw.try_into()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        sqlx::query_as::<_, RawUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx("find_user_by_username", "user"))?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        sqlx::query_as::<_, RawUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx("find_user_by_token", "user"))?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        sqlx::query_as::<_, RawUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx("find_user_by_id", "user"))?
            .map(User::try_from)
            .transpose()
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, StorageError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT password_hash, token FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx("authenticate", "user"))?;

        let (hash, token) = row.unzip();
        if verify_blocking(password, hash).await? {
            Ok(token)
        } else {
            Ok(None)
        }
    }

    async fn update_token(&self, user_id: i64, token: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE users SET token = $1 WHERE id = $2")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx("update_token", "token"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        sqlx::query_as::<_, RawUser>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx("list_users", "user"))?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn create_secret(
        &self,
        secret: &NewSecret,
        owner_id: i64,
    ) -> Result<Secret, StorageError> {
        let raw = sqlx::query_as::<_, RawSecret>(
            r"INSERT INTO secrets AS s (name, login_username, secret_value, user_id)
              VALUES ($1, $2, $3, $4)
              RETURNING s.id, s.name, s.login_username, s.secret_value, s.user_id,
                        s.created_at, s.updated_at",
        )
        .bind(&secret.name)
        .bind(&secret.login_username)
        .bind(&secret.value)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx("create_secret", "secret"))?;
        Ok(raw.into())
    }

    async fn find_secret_by_name_and_owner_token(
        &self,
        name: &str,
        token: &str,
    ) -> Result<Option<Secret>, StorageError> {
        let raw = sqlx::query_as::<_, RawSecret>(&format!(
            "SELECT {SECRET_COLUMNS} FROM secrets s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.name = $1 AND u.token = $2"
        ))
        .bind(name)
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx("find_secret", "secret"))?;
        Ok(raw.map(Secret::from))
    }

    async fn list_secrets_by_owner_token(
        &self,
        token: &str,
    ) -> Result<Vec<Secret>, StorageError> {
        let rows = sqlx::query_as::<_, RawSecret>(&format!(
            "SELECT {SECRET_COLUMNS} FROM secrets s \
             JOIN users u ON u.id = s.user_id \
             WHERE u.token = $1 ORDER BY s.name"
        ))
        .bind(token)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx("list_secrets", "secret"))?;
        Ok(rows.into_iter().map(Secret::from).collect())
    }

    async fn update_secret(
        &self,
        secret: &NewSecret,
        owner_id: i64,
    ) -> Result<Option<Secret>, StorageError> {
        let raw = sqlx::query_as::<_, RawSecret>(
            r"UPDATE secrets AS s
              SET login_username = $1, secret_value = $2, updated_at = now()
              WHERE s.name = $3 AND s.user_id = $4
              RETURNING s.id, s.name, s.login_username, s.secret_value, s.user_id,
                        s.created_at, s.updated_at",
        )
        .bind(&secret.login_username)
        .bind(&secret.value)
        .bind(&secret.name)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx("update_secret", "secret"))?;
        Ok(raw.map(Secret::from))
    }

    async fn delete_secret(&self, name: &str, owner_id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM secrets WHERE name = $1 AND user_id = $2")
            .bind(name)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx("delete_secret", "secret"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_key(&self, key: &[u8; KEY_LEN], owner_id: i64) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO keys (key_bytes, user_id) VALUES ($1, $2)")
            .bind(key.as_slice())
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx("create_key", "key"))?;
        Ok(())
    }

    async fn find_key_by_owner_id(
        &self,
        owner_id: i64,
    ) -> Result<Option<StoredKey>, StorageError> {
        sqlx::query_as::<_, RawKey>("SELECT id, key_bytes, user_id FROM keys WHERE user_id = $1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx("find_key", "key"))?
            .map(StoredKey::try_from)
            .transpose()
    }
}
