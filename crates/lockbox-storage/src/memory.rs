//! In-memory storage backend for testing.
//!
//! All three tables live in `BTreeMap`s behind one `RwLock`. It is not
//! persistent; all data is lost when the process exits. It enforces the same
//! uniqueness and ownership rules as the PostgreSQL backend, so the vault
//! core and HTTP layer can be tested against it without a database.
//!
//! Password hashing runs before the lock is taken; the lock is never held
//! across an `.await`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

use crate::model::{KEY_LEN, NewSecret, NewUser, Secret, StoredKey, User};
use crate::password::{hash_blocking, verify_blocking};
use crate::{CredentialStore, StorageError};

struct UserRow {
    user: User,
    password_hash: String,
}

struct KeyRow {
    id: i64,
    owner_id: i64,
    key: Zeroizing<[u8; KEY_LEN]>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, UserRow>,
    secrets: BTreeMap<i64, Secret>,
    keys: BTreeMap<i64, KeyRow>,
    last_user_id: i64,
    last_secret_id: i64,
    last_key_id: i64,
}

impl Tables {
    fn user_by_token(&self, token: &str) -> Option<&User> {
        self.users
            .values()
            .map(|row| &row.user)
            .find(|u| u.token == token)
    }

    fn insert_user(
        &mut self,
        new: &NewUser,
        password_hash: String,
        token: &str,
    ) -> Result<User, StorageError> {
        let taken = self
            .users
            .values()
            .any(|row| row.user.username == new.username || row.user.token == token);
        if taken {
            return Err(StorageError::Conflict { entity: "user" });
        }

        self.last_user_id += 1;
        let user = User {
            id: self.last_user_id,
            username: new.username.clone(),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            role: new.role,
            token: token.to_owned(),
            created_at: Utc::now(),
        };
        self.users.insert(
            user.id,
            UserRow {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(user)
    }

    fn insert_key(&mut self, key: &[u8; KEY_LEN], owner_id: i64) -> Result<(), StorageError> {
        if !self.users.contains_key(&owner_id) {
            return Err(StorageError::NotFound { entity: "user" });
        }
        if self.keys.values().any(|k| k.owner_id == owner_id) {
            return Err(StorageError::Conflict { entity: "key" });
        }

        self.last_key_id += 1;
        self.keys.insert(
            self.last_key_id,
            KeyRow {
                id: self.last_key_id,
                owner_id,
                key: Zeroizing::new(*key),
            },
        );
        Ok(())
    }
}

/// An in-memory [`CredentialStore`].
///
/// Clones share state, like clones of a connection pool.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, user: &NewUser, token: &str) -> Result<User, StorageError> {
        let hash = hash_blocking(&user.password).await?;
        let mut tables = self.tables.write().await;
        tables.insert_user(user, hash, token)
    }

    async fn create_user_with_key(
        &self,
        user: &NewUser,
        token: &str,
        key: &[u8; KEY_LEN],
    ) -> Result<User, StorageError> {
        let hash = hash_blocking(&user.password).await?;
        let mut tables = self.tables.write().await;
        let created = tables.insert_user(user, hash, token)?;
        if let Err(e) = tables.insert_key(key, created.id) {
            tables.users.remove(&created.id);
            return Err(e);
        }
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|row| row.user.username == username)
            .map(|row| row.user.clone()))
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.user_by_token(token).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|row| row.user.clone()))
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, StorageError> {
        let found = {
            let tables = self.tables.read().await;
            tables
                .users
                .values()
                .find(|row| row.user.username == username)
                .map(|row| (row.password_hash.clone(), row.user.token.clone()))
        };

        let (hash, token) = match found {
            Some((hash, token)) => (Some(hash), Some(token)),
            None => (None, None),
        };

        if verify_blocking(password, hash).await? {
            Ok(token)
        } else {
            Ok(None)
        }
    }

    async fn update_token(&self, user_id: i64, token: &str) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|row| row.user.id != user_id && row.user.token == token)
        {
            return Err(StorageError::Conflict { entity: "token" });
        }
        match tables.users.get_mut(&user_id) {
            Some(row) => {
                token.clone_into(&mut row.user.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().map(|row| row.user.clone()).collect())
    }

    async fn create_secret(
        &self,
        secret: &NewSecret,
        owner_id: i64,
    ) -> Result<Secret, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&owner_id) {
            return Err(StorageError::NotFound { entity: "user" });
        }
        if tables
            .secrets
            .values()
            .any(|s| s.owner_id == owner_id && s.name == secret.name)
        {
            return Err(StorageError::Conflict { entity: "secret" });
        }

        tables.last_secret_id += 1;
        let now = Utc::now();
        let row = Secret {
            id: tables.last_secret_id,
            name: secret.name.clone(),
            login_username: secret.login_username.clone(),
            value: secret.value.clone(),
            owner_id,
            created_at: now,
            updated_at: now,
        };
        tables.secrets.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_secret_by_name_and_owner_token(
        &self,
        name: &str,
        token: &str,
    ) -> Result<Option<Secret>, StorageError> {
        let tables = self.tables.read().await;
        let Some(owner) = tables.user_by_token(token) else {
            return Ok(None);
        };
        Ok(tables
            .secrets
            .values()
            .find(|s| s.owner_id == owner.id && s.name == name)
            .cloned())
    }

    async fn list_secrets_by_owner_token(
        &self,
        token: &str,
    ) -> Result<Vec<Secret>, StorageError> {
        let tables = self.tables.read().await;
        let Some(owner) = tables.user_by_token(token) else {
            return Ok(Vec::new());
        };
        let mut secrets: Vec<Secret> = tables
            .secrets
            .values()
            .filter(|s| s.owner_id == owner.id)
            .cloned()
            .collect();
        secrets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(secrets)
    }

    async fn update_secret(
        &self,
        secret: &NewSecret,
        owner_id: i64,
    ) -> Result<Option<Secret>, StorageError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .secrets
            .values_mut()
            .find(|s| s.owner_id == owner_id && s.name == secret.name)
        else {
            return Ok(None);
        };
        secret.login_username.clone_into(&mut row.login_username);
        secret.value.clone_into(&mut row.value);
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_secret(&self, name: &str, owner_id: i64) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        let id = tables
            .secrets
            .values()
            .find(|s| s.owner_id == owner_id && s.name == name)
            .map(|s| s.id);
        Ok(id.and_then(|id| tables.secrets.remove(&id)).is_some())
    }

    async fn create_key(&self, key: &[u8; KEY_LEN], owner_id: i64) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        tables.insert_key(key, owner_id)
    }

    async fn find_key_by_owner_id(
        &self,
        owner_id: i64,
    ) -> Result<Option<StoredKey>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .keys
            .values()
            .find(|k| k.owner_id == owner_id)
            .map(|k| StoredKey {
                id: k.id,
                owner_id: k.owner_id,
                key: k.key.clone(),
            }))
    }
}
