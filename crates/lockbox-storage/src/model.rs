//! Entities persisted by the storage gateway.
//!
//! Entities are plain owned values. Nothing here is cached by callers: every
//! read goes back to the store, so a rotated token is visible immediately.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Width of a per-user symmetric key in bytes.
pub const KEY_LEN: usize = 32;

/// Authorization role, fixed when the user is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May provision and inspect users.
    Admin,
    /// May only touch its own secrets and key.
    #[default]
    Standard,
}

impl Role {
    /// Column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "standard" => Ok(Self::Standard),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered user. The password hash never leaves the store.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    /// Current bearer token.
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Fields needed to create a user. The password is plaintext here and is
/// hashed by the store before it is written.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// A named credential owned by exactly one user.
///
/// `value` is stored exactly as received. Clients that want confidentiality
/// at rest encrypt it with their issued key before sending it.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    pub id: i64,
    pub name: String,
    pub login_username: String,
    pub value: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("login_username", &self.login_username)
            .field("value", &"[REDACTED]")
            .field("owner_id", &self.owner_id)
            .finish_non_exhaustive()
    }
}

/// Fields for creating or replacing a secret.
#[derive(Clone)]
pub struct NewSecret {
    pub name: String,
    pub login_username: String,
    pub value: String,
}

impl fmt::Debug for NewSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSecret")
            .field("name", &self.name)
            .field("login_username", &self.login_username)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// A per-user symmetric key row. Bytes are wiped on drop.
pub struct StoredKey {
    pub id: i64,
    pub owner_id: i64,
    pub key: Zeroizing<[u8; KEY_LEN]>,
}

impl fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKey")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
