//! Error types for the Lockbox core.
//!
//! [`AuthError`] covers the token protocol, [`VaultError`] is what every
//! [`Vault`](crate::Vault) operation returns. Storage failures are logged
//! with their operation name here and then collapsed into
//! [`VaultError::StorageUnavailable`] or [`VaultError::Internal`], so driver
//! text never travels further up.

use lockbox_storage::StorageError;

/// Errors from base64 transport encoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Bad length, a byte outside the alphabet, misplaced padding, or an
    /// output buffer too small for the decoded bytes.
    #[error("invalid base64 encoding: {reason}")]
    InvalidEncoding { reason: String },
}

/// Errors from client-side envelope encryption.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// Wrong key, corrupted ciphertext, or tampered tag.
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// The input is shorter than nonce plus tag.
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },

    /// The value does not carry the envelope prefix.
    #[error("value is not a sealed envelope")]
    NotSealed,

    /// The envelope body is not valid base64.
    #[error("envelope encoding error: {0}")]
    Encoding(#[from] CodecError),

    /// The decrypted bytes are not UTF-8 text.
    #[error("decrypted value is not valid UTF-8")]
    NotUtf8,
}

/// Errors from the authentication protocol.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Login failed. Unknown usernames and wrong passwords look the same.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The token is missing or does not belong to any user.
    #[error("missing or unknown token")]
    Unauthorized,

    /// The token is valid but the user may not perform this operation.
    #[error("permission denied")]
    Forbidden,

    /// The store failed while resolving the caller.
    #[error("authentication storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors returned by vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Authentication or authorization failed.
    #[error(transparent)]
    Auth(AuthError),

    /// The requested entity does not exist for this caller.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A uniqueness rule rejected the write.
    #[error("{entity} already exists")]
    Conflict { entity: &'static str },

    /// The request carried malformed input.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The store could not serve the request.
    #[error("storage unavailable during {operation}")]
    StorageUnavailable { operation: &'static str },

    /// Anything else; details are only in the log.
    #[error("internal error during {operation}")]
    Internal { operation: &'static str },
}

impl VaultError {
    /// Log a storage failure with its operation and convert it.
    pub(crate) fn storage(operation: &'static str, err: StorageError) -> Self {
        match err {
            StorageError::Conflict { entity } => Self::Conflict { entity },
            StorageError::NotFound { entity } => Self::NotFound { entity },
            StorageError::Connection { .. } | StorageError::Query { .. } => {
                tracing::error!(operation, error = %err, "storage unavailable");
                Self::StorageUnavailable { operation }
            }
            StorageError::Schema { .. }
            | StorageError::PasswordHash { .. }
            | StorageError::Corrupt { .. } => {
                tracing::error!(operation, error = %err, "storage internal failure");
                Self::Internal { operation }
            }
        }
    }

    /// Adapter for `map_err`.
    pub(crate) fn during(operation: &'static str) -> impl Fn(StorageError) -> Self {
        move |err| Self::storage(operation, err)
    }
}

impl From<AuthError> for VaultError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Storage(inner) => Self::storage("authenticate", inner),
            other => Self::Auth(other),
        }
    }
}
