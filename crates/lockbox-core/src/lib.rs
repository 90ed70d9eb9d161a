//! Core library for Lockbox.
//!
//! Contains the [`Vault`] service (token authentication, role gating,
//! tenant-scoped secret access, per-user key issuance), the base64 codec and
//! token generator it uses, and the client-side envelope helpers for sealing
//! secret values with an issued key. Persistence goes through the
//! [`CredentialStore`](lockbox_storage::CredentialStore) trait from
//! `lockbox-storage`; this crate knows nothing about HTTP.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod token;
pub mod vault;

pub use error::{AuthError, CodecError, CryptoError, VaultError};
pub use keys::UserKey;
pub use vault::{AdminBootstrap, SecretView, UserView, Vault};
