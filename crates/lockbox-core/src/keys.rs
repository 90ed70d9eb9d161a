//! Per-user symmetric key material.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::codec;
use crate::error::CodecError;
use lockbox_storage::KEY_LEN;

/// A 256-bit key issued to a user at provisioning time. Zeroized on drop and
/// redacted in `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct UserKey([u8; KEY_LEN]);

impl UserKey {
    /// Generate a fresh key from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the base64 form handed out by the key endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidEncoding`] if the text is not base64 or
    /// does not decode to exactly [`KEY_LEN`] bytes.
    pub fn from_base64(text: &str) -> Result<Self, CodecError> {
        // Wiped on every exit, including a partial decode that overflowed.
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        let written = codec::decode_into(text.trim(), &mut *bytes)?;
        if written != KEY_LEN {
            return Err(CodecError::InvalidEncoding {
                reason: format!("expected {KEY_LEN} key bytes, got {written}"),
            });
        }
        Ok(Self(*bytes))
    }

    /// Borrow the raw key bytes. The caller must not log or persist them.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        codec::encode(&self.0)
    }
}

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_differ() {
        assert_ne!(UserKey::generate().as_bytes(), UserKey::generate().as_bytes());
    }

    #[test]
    fn base64_form_parses_back() {
        let key = UserKey::generate();
        let parsed = UserKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());
    }

    #[test]
    fn trailing_newline_is_tolerated() {
        let key = UserKey::from_bytes([3u8; KEY_LEN]);
        let text = format!("{}\n", key.to_base64());
        assert!(UserKey::from_base64(&text).is_ok());
    }

    #[test]
    fn short_key_is_rejected() {
        let text = codec::encode(&[1u8; 16]);
        assert!(UserKey::from_base64(&text).is_err());
    }

    #[test]
    fn oversized_key_is_rejected() {
        let text = codec::encode(&[1u8; KEY_LEN + 16]);
        assert!(matches!(
            UserKey::from_base64(&text),
            Err(CodecError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn debug_redacts_bytes() {
        let key = UserKey::from_bytes([0xAB; KEY_LEN]);
        let debug = format!("{key:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("171"));
    }
}
