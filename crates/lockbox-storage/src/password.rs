//! One-way password hashing.
//!
//! Passwords are stored as Argon2id PHC strings with a fresh random salt per
//! user. Hashing is CPU-bound, so the async helpers move it onto the blocking
//! pool instead of stalling a runtime worker.

use std::sync::LazyLock;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use zeroize::Zeroizing;

use crate::StorageError;

/// Verified against when the username is unknown so both failure paths cost
/// the same.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("lockbox-unknown-user").ok());

/// Hash a plaintext password into a PHC string.
///
/// # Errors
///
/// Returns [`StorageError::PasswordHash`] if Argon2 rejects its parameters.
pub fn hash_password(password: &str) -> Result<String, StorageError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StorageError::PasswordHash {
            reason: e.to_string(),
        })
}

/// Check a plaintext password against a stored PHC string.
///
/// # Errors
///
/// Returns [`StorageError::Corrupt`] if the stored hash cannot be parsed.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, StorageError> {
    let parsed = PasswordHash::new(stored).map_err(|e| StorageError::Corrupt {
        entity: "user",
        reason: format!("unparseable password hash: {e}"),
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub(crate) async fn hash_blocking(password: &str) -> Result<String, StorageError> {
    let password = Zeroizing::new(password.to_owned());
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| StorageError::PasswordHash {
            reason: e.to_string(),
        })?
}

/// Verify on the blocking pool. `stored` is `None` when the user does not
/// exist; the dummy hash is checked anyway and the result is always `false`.
pub(crate) async fn verify_blocking(
    password: &str,
    stored: Option<String>,
) -> Result<bool, StorageError> {
    let password = Zeroizing::new(password.to_owned());
    tokio::task::spawn_blocking(move || match stored {
        Some(hash) => verify_password(&password, &hash),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(&password, dummy);
            }
            Ok(false)
        }
    })
    .await
    .map_err(|e| StorageError::PasswordHash {
        reason: e.to_string(),
    })?
}
