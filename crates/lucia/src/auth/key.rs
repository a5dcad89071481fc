// Keys: the credential references that connect a sign-in method to a user.
//
// A key id is `<provider_id>:<provider_user_id>`, e.g. `email:user@example.com`
// or `github:80112`. Persistent keys live until removed; single-use keys carry
// an expiry and are consumed by their first successful use. Exactly one key
// per user may be primary, set only at user creation, and a primary key can
// never be removed on its own.

use lucia_core::{KeyRow, LuciaError, Result};

use crate::auth::{Auth, UserAttributes};
use crate::crypto::{hash_password, verify_password};

// Hashes produced by the old bcrypt scheme. Passwords behind them must be
// re-set, not verified.
const BCRYPT_PREFIX: &str = "$2a";

/// Key supplied alongside a new user, stored as the user's primary key.
#[derive(Debug, Clone)]
pub struct InitialKey {
    pub provider_id: String,
    pub provider_user_id: String,
    /// Hashed before storage; `None` for keys that are proof of a foreign
    /// login (OAuth and the like) rather than a password.
    pub password: Option<String>,
}

/// A key as handed back to callers. The password hash never leaves the
/// engine; only its presence is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub provider_id: String,
    pub provider_user_id: String,
    pub user_id: String,
    pub password_defined: bool,
    /// Set at user creation; primary keys resist [`Auth::delete_key`].
    pub primary: bool,
    /// Expiry in epoch milliseconds for single-use keys, `None` for
    /// persistent ones.
    pub expires: Option<i64>,
}

impl Key {
    /// Whether the key is consumed by its first successful use.
    pub fn single_use(&self) -> bool {
        self.expires.is_some()
    }

    fn from_row(row: KeyRow) -> Self {
        // Stored ids always contain the separator; tolerate a missing one
        // from a hand-edited database rather than panic.
        let (provider_id, provider_user_id) = match row.id.split_once(':') {
            Some((provider_id, provider_user_id)) => {
                (provider_id.to_string(), provider_user_id.to_string())
            }
            None => (row.id.clone(), String::new()),
        };
        Key {
            provider_id,
            provider_user_id,
            user_id: row.user_id,
            password_defined: row.hashed_password.is_some(),
            primary: row.primary_key,
            expires: row.expires,
        }
    }
}

/// Join a provider id and provider user id into a stored key id.
///
/// The provider id must not contain `:`, which separates the two parts.
pub fn create_key_id(provider_id: &str, provider_user_id: &str) -> Result<String> {
    if provider_id.contains(':') {
        return Err(LuciaError::InvalidKeyId);
    }
    Ok(format!("{provider_id}:{provider_user_id}"))
}

impl<T: UserAttributes> Auth<T> {
    // ─── Keys ────────────────────────────────────────────────────────

    /// Add a persistent non-primary key to an existing user.
    pub async fn create_key(
        &self,
        user_id: &str,
        provider_id: &str,
        provider_user_id: &str,
        password: Option<&str>,
    ) -> Result<Key> {
        self.persist_key(user_id, provider_id, provider_user_id, password, None)
            .await
    }

    /// Add a single-use key expiring `expires_in` milliseconds from now.
    /// Using it successfully deletes it.
    pub async fn create_single_use_key(
        &self,
        user_id: &str,
        provider_id: &str,
        provider_user_id: &str,
        password: Option<&str>,
        expires_in: i64,
    ) -> Result<Key> {
        let expires = super::session::now_ms() + expires_in;
        self.persist_key(user_id, provider_id, provider_user_id, password, Some(expires))
            .await
    }

    async fn persist_key(
        &self,
        user_id: &str,
        provider_id: &str,
        provider_user_id: &str,
        password: Option<&str>,
        expires: Option<i64>,
    ) -> Result<Key> {
        let key_id = create_key_id(provider_id, provider_user_id)?;
        let hashed_password = match password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };
        let row = KeyRow {
            id: key_id.clone(),
            user_id: user_id.to_string(),
            hashed_password,
            primary_key: false,
            expires,
        };
        self.adapter.set_key(&row).await?;
        tracing::debug!(user_id, key_id = %key_id, "created key");
        Ok(Key::from_row(row))
    }

    /// Validate a credential against a key and return it on success.
    ///
    /// The password argument must match the key's shape: a password-holding
    /// key requires `Some` and verifies it, a passwordless key requires
    /// `None`. Expired single-use keys are deleted and reported as
    /// [`LuciaError::InvalidKeyId`]; a successful use consumes a live
    /// single-use key.
    pub async fn use_key(
        &self,
        provider_id: &str,
        provider_user_id: &str,
        password: Option<&str>,
    ) -> Result<Key> {
        let key_id = create_key_id(provider_id, provider_user_id)?;
        let row = self
            .adapter
            .get_key(&key_id)
            .await?
            .ok_or(LuciaError::InvalidKeyId)?;

        if let Some(expires) = row.expires {
            if super::session::now_ms() >= expires {
                self.adapter.delete_key(&key_id).await?;
                tracing::debug!(key_id = %key_id, "deleted expired single-use key");
                return Err(LuciaError::InvalidKeyId);
            }
        }

        match (&row.hashed_password, password) {
            (Some(hashed), Some(password)) => {
                if hashed.starts_with(BCRYPT_PREFIX) {
                    return Err(LuciaError::OutdatedPassword);
                }
                if !verify_password(hashed, password) {
                    tracing::warn!(key_id = %key_id, "password verification failed");
                    return Err(LuciaError::InvalidPassword);
                }
            }
            (None, None) => {}
            // A password where none is stored, or none where one is
            // required, fails the same way as a wrong password.
            _ => return Err(LuciaError::InvalidPassword),
        }

        if row.expires.is_some() {
            self.adapter.delete_key(&key_id).await?;
            tracing::debug!(key_id = %key_id, "consumed single-use key");
        }
        Ok(Key::from_row(row))
    }

    /// Fetch a key by its two-part id, password shape unchecked.
    pub async fn get_key(&self, provider_id: &str, provider_user_id: &str) -> Result<Key> {
        let key_id = create_key_id(provider_id, provider_user_id)?;
        let row = self
            .adapter
            .get_key(&key_id)
            .await?
            .ok_or(LuciaError::InvalidKeyId)?;
        Ok(Key::from_row(row))
    }

    /// Every key belonging to a user, expired single-use keys included.
    pub async fn get_all_user_keys(&self, user_id: &str) -> Result<Vec<Key>> {
        let rows = self.adapter.get_keys_by_user_id(user_id).await?;
        Ok(rows.into_iter().map(Key::from_row).collect())
    }

    /// Re-hash and store a new password for a key, then invalidate every
    /// session of the owning user so stolen sessions die with the old
    /// password.
    pub async fn update_key_password(
        &self,
        provider_id: &str,
        provider_user_id: &str,
        password: Option<&str>,
    ) -> Result<Key> {
        let key_id = create_key_id(provider_id, provider_user_id)?;
        let row = self
            .adapter
            .get_key(&key_id)
            .await?
            .ok_or(LuciaError::InvalidKeyId)?;
        let hashed_password = match password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };
        self.adapter
            .update_key_password(&key_id, hashed_password.as_deref())
            .await?;
        self.invalidate_all_user_sessions(&row.user_id).await?;
        tracing::debug!(key_id = %key_id, "updated key password");
        Ok(Key::from_row(KeyRow {
            hashed_password,
            ..row
        }))
    }

    /// Remove a non-primary key. Missing keys and primary keys are left
    /// untouched and the call succeeds either way.
    pub async fn delete_key(&self, provider_id: &str, provider_user_id: &str) -> Result<()> {
        let key_id = create_key_id(provider_id, provider_user_id)?;
        let Some(row) = self.adapter.get_key(&key_id).await? else {
            return Ok(());
        };
        if row.primary_key {
            return Ok(());
        }
        self.adapter.delete_key(&key_id).await?;
        tracing::debug!(key_id = %key_id, "deleted key");
        Ok(())
    }
}
