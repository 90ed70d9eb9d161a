//! Client-side envelope encryption with a user's issued key.
//!
//! The server stores secret values as opaque text and never calls into this
//! module. Clients that want confidentiality at rest seal the value before
//! sending it and open it after reading it back.
//!
//! Sealed format: `lockbox:v1:` followed by base64 of
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`. A fresh nonce is drawn
//! from `OsRng` for every seal.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::codec;
use crate::error::CryptoError;
use crate::keys::UserKey;

/// Marks a value as sealed.
pub const ENVELOPE_PREFIX: &str = "lockbox:v1:";

const NONCE_LEN: usize = 12;
const MIN_SEALED_LEN: usize = NONCE_LEN + 16;

/// Whether `value` looks like the output of [`seal`].
#[must_use]
pub fn is_sealed(value: &str) -> bool {
    value.starts_with(ENVELOPE_PREFIX)
}

/// Encrypt `plaintext` under `key`.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
pub fn seal(key: &UserKey, plaintext: &str) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext =
        cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption {
                reason: e.to_string(),
            })?;

    let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(ciphertext.len()));
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(format!("{ENVELOPE_PREFIX}{}", codec::encode(&combined)))
}

/// Decrypt a value produced by [`seal`].
///
/// # Errors
///
/// - [`CryptoError::NotSealed`] if the prefix is missing.
/// - [`CryptoError::Encoding`] if the body is not base64.
/// - [`CryptoError::CiphertextTooShort`] if the body cannot hold nonce and tag.
/// - [`CryptoError::Decryption`] on a wrong key or tampered data.
/// - [`CryptoError::NotUtf8`] if the plaintext is not text.
pub fn open(key: &UserKey, sealed: &str) -> Result<String, CryptoError> {
    let body = sealed
        .strip_prefix(ENVELOPE_PREFIX)
        .ok_or(CryptoError::NotSealed)?;
    let combined = codec::decode(body)?;
    if combined.len() < MIN_SEALED_LEN {
        return Err(CryptoError::CiphertextTooShort {
            expected: MIN_SEALED_LEN,
            actual: combined.len(),
        });
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| CryptoError::Decryption {
            reason: e.to_string(),
        })?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::NotUtf8)
}
