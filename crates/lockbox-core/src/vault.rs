//! The vault service.
//!
//! [`Vault`] is the single place that knows about tokens, roles, and tenant
//! scoping. Every protected operation starts by resolving the presented token
//! through [`Vault::authenticate_token`], which re-reads the user row on each
//! call; nothing about a caller is cached between requests.
//!
//! The vault is cheap to clone and is shared by all request handlers.

use std::fmt;
use std::sync::Arc;

use lockbox_storage::{CredentialStore, NewSecret, NewUser, Role, Secret, User};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{AuthError, VaultError};
use crate::keys::UserKey;
use crate::token::{SESSION_TOKEN_LEN, generate_token};

/// Longest accepted username, name, or secret label, in characters.
pub const MAX_LABEL_LEN: usize = 255;

/// Largest accepted secret value, in bytes.
pub const MAX_SECRET_VALUE_LEN: usize = 1024 * 1024;

// ── Views ────────────────────────────────────────────────────────────

/// What an admin sees about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// What an owner sees about one of their secrets.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretView {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub password: String,
}

impl From<Secret> for SecretView {
    fn from(secret: Secret) -> Self {
        Self {
            id: secret.id,
            name: secret.name,
            username: secret.login_username,
            password: secret.value,
        }
    }
}

impl fmt::Debug for SecretView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretView")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// ── Validation ───────────────────────────────────────────────────────

fn validate_label(field: &str, value: &str) -> Result<(), VaultError> {
    let len = value.chars().count();
    if len == 0 || len > MAX_LABEL_LEN {
        return Err(VaultError::Validation {
            reason: format!("{field} must be 1 to {MAX_LABEL_LEN} characters"),
        });
    }
    Ok(())
}

fn validate_new_user(user: &NewUser) -> Result<(), VaultError> {
    validate_label("username", &user.username)?;
    validate_label("first_name", &user.first_name)?;
    validate_label("last_name", &user.last_name)?;
    if user.password.is_empty() {
        return Err(VaultError::Validation {
            reason: "password must not be empty".to_owned(),
        });
    }
    Ok(())
}

fn validate_secret(secret: &NewSecret) -> Result<(), VaultError> {
    validate_label("name", &secret.name)?;
    if secret.login_username.chars().count() > MAX_LABEL_LEN {
        return Err(VaultError::Validation {
            reason: format!("username must be at most {MAX_LABEL_LEN} characters"),
        });
    }
    if secret.value.len() > MAX_SECRET_VALUE_LEN {
        return Err(VaultError::Validation {
            reason: format!("password must be at most {MAX_SECRET_VALUE_LEN} bytes"),
        });
    }
    Ok(())
}

// ── Vault ────────────────────────────────────────────────────────────

/// Outcome of [`Vault::bootstrap_admin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminBootstrap {
    /// The admin account was created.
    Created,
    /// An admin with that username already exists.
    AlreadyAdmin,
    /// The username belongs to a non-admin account.
    NotAdmin,
}

impl AdminBootstrap {
    fn existing(user: &User) -> Self {
        if user.is_admin() {
            Self::AlreadyAdmin
        } else {
            Self::NotAdmin
        }
    }
}

/// Token-authenticated, tenant-scoped access to a [`CredentialStore`].
#[derive(Clone)]
pub struct Vault {
    store: Arc<dyn CredentialStore>,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}

impl Vault {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Exchange a username and password for the user's current token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown username and
    /// for a wrong password alike.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        match self.store.authenticate(username, password).await? {
            Some(token) => {
                tracing::info!(username, "login succeeded");
                Ok(token)
            }
            None => {
                tracing::warn!(username, "login rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Resolve a token to its user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] if the token is empty or unknown.
    pub async fn authenticate_token(&self, token: &str) -> Result<User, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }
        self.store
            .find_user_by_token(token)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    /// Resolve a token and require the admin role.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] for an unknown token and
    /// [`AuthError::Forbidden`] for a valid non-admin token.
    pub async fn require_admin(&self, token: &str) -> Result<User, AuthError> {
        let user = self.authenticate_token(token).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = user.id, "admin operation refused");
            return Err(AuthError::Forbidden);
        }
        Ok(user)
    }

    /// Issue a new token for the caller. The old token stops working at once.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] (wrapped) for an unknown token.
    pub async fn rotate_token(&self, token: &str) -> Result<String, VaultError> {
        let caller = self.authenticate_token(token).await?;
        let fresh = generate_token(SESSION_TOKEN_LEN);
        let updated = self
            .store
            .update_token(caller.id, &fresh)
            .await
            .map_err(VaultError::during("rotate_token"))?;
        if !updated {
            return Err(AuthError::Unauthorized.into());
        }
        tracing::info!(user_id = caller.id, "token rotated");
        Ok(fresh)
    }

    // ── Users ────────────────────────────────────────────────────────

    /// Provision a user and their symmetric key in one step and return the
    /// provisioning token. The token is shown once; only a hash of the
    /// password is kept.
    ///
    /// # Errors
    ///
    /// - Auth errors if `admin_token` is not an admin's.
    /// - [`VaultError::Validation`] for malformed fields.
    /// - [`VaultError::Conflict`] if the username is taken.
    pub async fn create_user(
        &self,
        admin_token: &str,
        new_user: &NewUser,
    ) -> Result<String, VaultError> {
        let admin = self.require_admin(admin_token).await?;
        validate_new_user(new_user)?;

        let token = generate_token(SESSION_TOKEN_LEN);
        let key = UserKey::generate();
        let user = self
            .store
            .create_user_with_key(new_user, &token, key.as_bytes())
            .await
            .map_err(VaultError::during("create_user"))?;

        tracing::info!(
            admin_id = admin.id,
            user_id = user.id,
            username = %user.username,
            role = %user.role,
            "user provisioned"
        );
        Ok(token)
    }

    /// # Errors
    ///
    /// Auth errors if `admin_token` is not an admin's.
    pub async fn list_users(&self, admin_token: &str) -> Result<Vec<UserView>, VaultError> {
        self.require_admin(admin_token).await?;
        let users = self
            .store
            .list_users()
            .await
            .map_err(VaultError::during("list_users"))?;
        Ok(users.iter().map(UserView::from).collect())
    }

    /// # Errors
    ///
    /// Auth errors if `admin_token` is not an admin's, and
    /// [`VaultError::NotFound`] if no user has this id.
    pub async fn get_user(&self, admin_token: &str, id: i64) -> Result<UserView, VaultError> {
        self.require_admin(admin_token).await?;
        self.store
            .find_user_by_id(id)
            .await
            .map_err(VaultError::during("get_user"))?
            .map(|user| UserView::from(&user))
            .ok_or(VaultError::NotFound { entity: "user" })
    }

    /// Return the caller's own symmetric key, base64-encoded.
    ///
    /// Only the key's owner may fetch it: a token for any other user gets
    /// [`AuthError::Forbidden`], whether or not `username` exists.
    ///
    /// # Errors
    ///
    /// Auth errors as above, and [`VaultError::NotFound`] if the caller has
    /// no key.
    pub async fn get_user_key(&self, token: &str, username: &str) -> Result<String, VaultError> {
        let caller = self.authenticate_token(token).await?;
        if caller.username != username {
            tracing::warn!(user_id = caller.id, "key request for another user refused");
            return Err(AuthError::Forbidden.into());
        }

        let stored = self
            .store
            .find_key_by_owner_id(caller.id)
            .await
            .map_err(VaultError::during("get_user_key"))?
            .ok_or(VaultError::NotFound { entity: "key" })?;
        Ok(codec::encode(stored.key.as_slice()))
    }

    /// Seed an admin user if no user with that username exists yet.
    ///
    /// An existing user is left alone. [`AdminBootstrap::NotAdmin`] tells the
    /// caller that the username is taken by an account without the admin
    /// role, so the seed gives no admin access.
    ///
    /// # Errors
    ///
    /// [`VaultError::Validation`] for malformed fields, or a storage error.
    pub async fn bootstrap_admin(&self, seed: &NewUser) -> Result<AdminBootstrap, VaultError> {
        validate_new_user(seed)?;

        let existing = self
            .store
            .find_user_by_username(&seed.username)
            .await
            .map_err(VaultError::during("bootstrap_admin"))?;
        if let Some(user) = existing {
            return Ok(AdminBootstrap::existing(&user));
        }

        let admin = NewUser {
            role: Role::Admin,
            ..seed.clone()
        };
        let token = generate_token(SESSION_TOKEN_LEN);
        let key = UserKey::generate();
        match self
            .store
            .create_user_with_key(&admin, &token, key.as_bytes())
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "admin provisioned");
                Ok(AdminBootstrap::Created)
            }
            // Another instance seeded it first.
            Err(lockbox_storage::StorageError::Conflict { .. }) => {
                let user = self
                    .store
                    .find_user_by_username(&seed.username)
                    .await
                    .map_err(VaultError::during("bootstrap_admin"))?;
                Ok(user.map_or(AdminBootstrap::NotAdmin, |u| AdminBootstrap::existing(&u)))
            }
            Err(e) => Err(VaultError::storage("bootstrap_admin", e)),
        }
    }

    // ── Secrets ──────────────────────────────────────────────────────

    /// Store a secret owned by the caller. The value is kept exactly as given.
    ///
    /// # Errors
    ///
    /// - Auth errors for an unknown token.
    /// - [`VaultError::Validation`] for malformed fields.
    /// - [`VaultError::Conflict`] if the caller already has a secret with
    ///   this name.
    pub async fn create_secret(
        &self,
        token: &str,
        secret: &NewSecret,
    ) -> Result<SecretView, VaultError> {
        let caller = self.authenticate_token(token).await?;
        validate_secret(secret)?;

        let created = self
            .store
            .create_secret(secret, caller.id)
            .await
            .map_err(VaultError::during("create_secret"))?;
        tracing::info!(user_id = caller.id, secret = %created.name, "secret stored");
        Ok(created.into())
    }

    /// # Errors
    ///
    /// Auth errors for an unknown token, and [`VaultError::NotFound`] if the
    /// caller has no secret with this name.
    pub async fn get_secret(&self, token: &str, name: &str) -> Result<SecretView, VaultError> {
        self.authenticate_token(token).await?;
        self.store
            .find_secret_by_name_and_owner_token(name, token)
            .await
            .map_err(VaultError::during("get_secret"))?
            .map(SecretView::from)
            .ok_or(VaultError::NotFound { entity: "secret" })
    }

    /// All of the caller's secrets, ordered by name. Empty is not an error.
    ///
    /// # Errors
    ///
    /// Auth errors for an unknown token.
    pub async fn list_secrets(&self, token: &str) -> Result<Vec<SecretView>, VaultError> {
        self.authenticate_token(token).await?;
        let secrets = self
            .store
            .list_secrets_by_owner_token(token)
            .await
            .map_err(VaultError::during("list_secrets"))?;
        Ok(secrets.into_iter().map(SecretView::from).collect())
    }

    /// Replace the login username and value of one of the caller's secrets.
    ///
    /// # Errors
    ///
    /// Auth errors for an unknown token, [`VaultError::Validation`] for
    /// malformed fields, and [`VaultError::NotFound`] if the caller has no
    /// secret with this name.
    pub async fn update_secret(
        &self,
        token: &str,
        secret: &NewSecret,
    ) -> Result<SecretView, VaultError> {
        let caller = self.authenticate_token(token).await?;
        validate_secret(secret)?;

        let updated = self
            .store
            .update_secret(secret, caller.id)
            .await
            .map_err(VaultError::during("update_secret"))?
            .ok_or(VaultError::NotFound { entity: "secret" })?;
        tracing::info!(user_id = caller.id, secret = %updated.name, "secret updated");
        Ok(updated.into())
    }

    /// # Errors
    ///
    /// Auth errors for an unknown token, and [`VaultError::NotFound`] if the
    /// caller has no secret with this name.
    pub async fn delete_secret(&self, token: &str, name: &str) -> Result<(), VaultError> {
        let caller = self.authenticate_token(token).await?;
        let deleted = self
            .store
            .delete_secret(name, caller.id)
            .await
            .map_err(VaultError::during("delete_secret"))?;
        if !deleted {
            return Err(VaultError::NotFound { entity: "secret" });
        }
        tracing::info!(user_id = caller.id, secret = name, "secret deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lockbox_storage::{KEY_LEN, MemoryStore};

    use super::*;

    const ADMIN_PW: &str = "admin-password";

    fn account(username: &str, password: &str) -> NewUser {
        NewUser {
            username: username.to_owned(),
            first_name: format!("{username}-first"),
            last_name: format!("{username}-last"),
            password: password.to_owned(),
            role: Role::Standard,
        }
    }

    fn secret(name: &str, value: &str) -> NewSecret {
        NewSecret {
            name: name.to_owned(),
            login_username: format!("{name}@example.com"),
            value: value.to_owned(),
        }
    }

    /// A vault with a bootstrapped admin, plus the admin's token.
    async fn vault_with_admin() -> (Vault, String) {
        let vault = Vault::new(Arc::new(MemoryStore::new()));
        assert_eq!(
            vault.bootstrap_admin(&account("admin", ADMIN_PW)).await.unwrap(),
            AdminBootstrap::Created
        );
        let token = vault.login("admin", ADMIN_PW).await.unwrap();
        (vault, token)
    }

    async fn provision(vault: &Vault, admin: &str, username: &str) -> String {
        vault
            .create_user(admin, &account(username, &format!("{username}-pw")))
            .await
            .unwrap();
        vault
            .login(username, &format!("{username}-pw"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn login_token_authenticates() {
        let (vault, admin) = vault_with_admin().await;
        let provisioning = vault
            .create_user(&admin, &account("alice", "alice-pw"))
            .await
            .unwrap();
        assert_eq!(provisioning.len(), SESSION_TOKEN_LEN);

        let token = vault.login("alice", "alice-pw").await.unwrap();
        let user = vault.authenticate_token(&token).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Standard);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let (vault, _) = vault_with_admin().await;
        let wrong = vault.login("admin", "nope").await.unwrap_err();
        let unknown = vault.login("nobody", ADMIN_PW).await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn empty_or_unknown_token_is_unauthorized() {
        let (vault, _) = vault_with_admin().await;
        assert!(matches!(
            vault.authenticate_token("").await,
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(
            vault.authenticate_token("bogus").await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn require_admin_distinguishes_forbidden_from_unauthorized() {
        let (vault, admin) = vault_with_admin().await;
        let alice = provision(&vault, &admin, "alice").await;

        assert!(vault.require_admin(&admin).await.is_ok());
        assert!(matches!(
            vault.require_admin(&alice).await,
            Err(AuthError::Forbidden)
        ));
        assert!(matches!(
            vault.require_admin("unknown").await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn non_admin_cannot_provision_or_list() {
        let (vault, admin) = vault_with_admin().await;
        let alice = provision(&vault, &admin, "alice").await;

        let err = vault
            .create_user(&alice, &account("mallory", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Auth(AuthError::Forbidden)));
        assert!(matches!(
            vault.list_users(&alice).await,
            Err(VaultError::Auth(AuthError::Forbidden))
        ));
    }

    #[tokio::test]
    async fn admin_role_is_an_attribute_not_a_username() {
        let (vault, admin) = vault_with_admin().await;
        let mut second = account("ops", "ops-pw");
        second.role = Role::Admin;
        vault.create_user(&admin, &second).await.unwrap();
        let ops = vault.login("ops", "ops-pw").await.unwrap();
        assert!(vault.list_users(&ops).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let (vault, admin) = vault_with_admin().await;
        provision(&vault, &admin, "alice").await;
        let err = vault
            .create_user(&admin, &account("alice", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Conflict { entity: "user" }));
    }

    #[tokio::test]
    async fn create_user_validates_fields() {
        let (vault, admin) = vault_with_admin().await;
        let err = vault
            .create_user(&admin, &account("", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation { .. }));

        let err = vault
            .create_user(&admin, &account("bob", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation { .. }));

        let long = "x".repeat(MAX_LABEL_LEN + 1);
        let err = vault
            .create_user(&admin, &account(&long, "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation { .. }));
    }

    #[tokio::test]
    async fn list_and_get_users() {
        let (vault, admin) = vault_with_admin().await;
        provision(&vault, &admin, "alice").await;

        let users = vault.list_users(&admin).await.unwrap();
        assert_eq!(users.len(), 2);
        let alice = users.iter().find(|u| u.first_name == "alice-first").unwrap();

        let fetched = vault.get_user(&admin, alice.id).await.unwrap();
        assert_eq!(&fetched, alice);
        assert!(matches!(
            vault.get_user(&admin, 9999).await,
            Err(VaultError::NotFound { entity: "user" })
        ));
    }

    #[tokio::test]
    async fn provisioned_key_decodes_to_32_bytes() {
        let (vault, admin) = vault_with_admin().await;
        let alice = provision(&vault, &admin, "alice").await;

        let encoded = vault.get_user_key(&alice, "alice").await.unwrap();
        let raw = codec::decode(&encoded).unwrap();
        assert_eq!(raw.len(), KEY_LEN);
    }

    #[tokio::test]
    async fn key_lookup_is_self_only() {
        let (vault, admin) = vault_with_admin().await;
        let alice = provision(&vault, &admin, "alice").await;
        provision(&vault, &admin, "bob").await;

        for target in ["bob", "ghost"] {
            let err = vault.get_user_key(&alice, target).await.unwrap_err();
            assert!(matches!(err, VaultError::Auth(AuthError::Forbidden)));
        }
        assert!(matches!(
            vault.get_user_key("bogus", "alice").await,
            Err(VaultError::Auth(AuthError::Unauthorized))
        ));
    }

    #[tokio::test]
    async fn secrets_are_isolated_between_tenants() {
        let (vault, admin) = vault_with_admin().await;
        let alice = provision(&vault, &admin, "alice").await;
        let bob = provision(&vault, &admin, "bob").await;

        vault.create_secret(&alice, &secret("mail", "a-value")).await.unwrap();
        vault.create_secret(&bob, &secret("mail", "b-value")).await.unwrap();

        assert_eq!(vault.get_secret(&alice, "mail").await.unwrap().password, "a-value");
        assert_eq!(vault.get_secret(&bob, "mail").await.unwrap().password, "b-value");

        vault.create_secret(&alice, &secret("bank", "a-only")).await.unwrap();
        assert!(matches!(
            vault.get_secret(&bob, "bank").await,
            Err(VaultError::NotFound { entity: "secret" })
        ));
        let bobs = vault.list_secrets(&bob).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert!(bobs.iter().all(|s| s.password == "b-value"));
    }

    #[tokio::test]
    async fn same_name_same_owner_conflicts() {
        let (vault, admin) = vault_with_admin().await;
        let alice = provision(&vault, &admin, "alice").await;
        vault.create_secret(&alice, &secret("mail", "1")).await.unwrap();
        let err = vault
            .create_secret(&alice, &secret("mail", "2"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Conflict { entity: "secret" }));
    }

    #[tokio::test]
    async fn empty_secret_list_is_ok() {
        let (vault, admin) = vault_with_admin().await;
        let alice = provision(&vault, &admin, "alice").await;
        assert!(vault.list_secrets(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn secret_operations_require_a_valid_token() {
        let (vault, _) = vault_with_admin().await;
        assert!(matches!(
            vault.create_secret("bogus", &secret("x", "y")).await,
            Err(VaultError::Auth(AuthError::Unauthorized))
        ));
        assert!(matches!(
            vault.list_secrets("bogus").await,
            Err(VaultError::Auth(AuthError::Unauthorized))
        ));
        assert!(matches!(
            vault.get_secret("bogus", "x").await,
            Err(VaultError::Auth(AuthError::Unauthorized))
        ));
    }

    #[tokio::test]
    async fn oversized_secret_is_rejected() {
        let (vault, admin) = vault_with_admin().await;
        let alice = provision(&vault, &admin, "alice").await;
        let huge = "x".repeat(MAX_SECRET_VALUE_LEN + 1);
        let err = vault
            .create_secret(&alice, &secret("big", &huge))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation { .. }));
    }

    #[tokio::test]
    async fn update_and_delete_are_owner_only() {
        let (vault, admin) = vault_with_admin().await;
        let alice = provision(&vault, &admin, "alice").await;
        let bob = provision(&vault, &admin, "bob").await;
        vault.create_secret(&alice, &secret("mail", "old")).await.unwrap();

        assert!(matches!(
            vault.update_secret(&bob, &secret("mail", "hijack")).await,
            Err(VaultError::NotFound { .. })
        ));
        assert!(matches!(
            vault.delete_secret(&bob, "mail").await,
            Err(VaultError::NotFound { .. })
        ));

        let updated = vault
            .update_secret(&alice, &secret("mail", "new"))
            .await
            .unwrap();
        assert_eq!(updated.password, "new");
        assert_eq!(vault.get_secret(&alice, "mail").await.unwrap().password, "new");

        vault.delete_secret(&alice, "mail").await.unwrap();
        assert!(vault.list_secrets(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rotated_token_replaces_the_old_one() {
        let (vault, admin) = vault_with_admin().await;
        let old = provision(&vault, &admin, "alice").await;
        vault.create_secret(&old, &secret("mail", "v")).await.unwrap();

        let fresh = vault.rotate_token(&old).await.unwrap();
        assert_ne!(fresh, old);
        assert!(matches!(
            vault.authenticate_token(&old).await,
            Err(AuthError::Unauthorized)
        ));
        assert_eq!(vault.get_secret(&fresh, "mail").await.unwrap().password, "v");
        assert_eq!(vault.login("alice", "alice-pw").await.unwrap(), fresh);
    }

    #[tokio::test]
    async fn bootstrap_admin_is_idempotent() {
        let (vault, _) = vault_with_admin().await;
        assert_eq!(
            vault.bootstrap_admin(&account("admin", "other")).await.unwrap(),
            AdminBootstrap::AlreadyAdmin
        );
        assert!(vault.login("admin", ADMIN_PW).await.is_ok());
    }

    #[tokio::test]
    async fn bootstrap_reports_standard_user_holding_the_name() {
        let (vault, admin) = vault_with_admin().await;
        provision(&vault, &admin, "ops").await;

        let outcome = vault.bootstrap_admin(&account("ops", "ops-pw")).await.unwrap();
        assert_eq!(outcome, AdminBootstrap::NotAdmin);

        let token = vault.login("ops", "ops-pw").await.unwrap();
        assert!(matches!(
            vault.list_users(&token).await,
            Err(VaultError::Auth(AuthError::Forbidden))
        ));
    }

    #[tokio::test]
    async fn concurrent_writers_keep_their_own_secrets() {
        const N: usize = 16;
        let (vault, admin) = vault_with_admin().await;

        let mut tokens = Vec::with_capacity(N);
        for i in 0..N {
            tokens.push(provision(&vault, &admin, &format!("user{i}")).await);
        }

        let mut handles = Vec::with_capacity(N);
        for (i, token) in tokens.iter().enumerate() {
            let vault = vault.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                vault
                    .create_secret(&token, &secret("shared-name", &format!("value-{i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for (i, token) in tokens.iter().enumerate() {
            let all = vault.list_secrets(token).await.unwrap();
            assert_eq!(all.len(), 1);
            assert_eq!(all[0].password, format!("value-{i}"));
        }
    }

    #[test]
    fn secret_view_debug_redacts_value() {
        let view = SecretView {
            id: 1,
            name: "mail".to_owned(),
            username: "me".to_owned(),
            password: "hunter2".to_owned(),
        };
        assert!(!format!("{view:?}").contains("hunter2"));
    }

    #[test]
    fn secret_view_serializes_wire_names() {
        let view = SecretView {
            id: 3,
            name: "mail".to_owned(),
            username: "me".to_owned(),
            password: "pw".to_owned(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 3, "name": "mail", "username": "me", "password": "pw"})
        );
    }
}
