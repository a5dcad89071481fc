// The auth engine facade.
//
// `Auth` owns the adapter handle and the configuration; the session, key,
// and request operations live in the sibling modules as further impl
// blocks on it. The engine holds no other state: every operation
// round-trips through the adapter, so any number of clones (or processes)
// can serve the same store.

pub mod key;
pub mod request;
pub mod session;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use lucia_core::{Adapter, KeyRow, LuciaError, RawUserAttributes, Result, UserRow};

use crate::auth::key::InitialKey;
use crate::auth::session::Session;
use crate::config::Config;
use crate::cookies::session_cookie::{create_session_cookie, SessionCookie};
use crate::crypto::{generate_random_string, hash_password, DEFAULT_ALPHABET};

/// Generated user ids are 15 characters from the default alphabet.
const USER_ID_LENGTH: usize = 15;

/// The application-defined user attribute shape.
///
/// Any `serde` struct qualifies, as does [`RawUserAttributes`] itself when
/// the caller wants the untyped bag. Attributes must serialize to a JSON
/// object; the engine stores them opaquely and converts at the boundary.
pub trait UserAttributes:
    Serialize + DeserializeOwned + Clone + Send + Sync + fmt::Debug + 'static
{
}

impl<T> UserAttributes for T where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + fmt::Debug + 'static
{
}

/// A user as seen by the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User<T> {
    pub user_id: String,
    pub attributes: T,
}

/// Options for [`Auth::create_user`].
#[derive(Debug, Clone)]
pub struct CreateUserOptions<T> {
    /// Caller-supplied id; a random 15-character id is generated when
    /// `None`.
    pub user_id: Option<String>,
    /// Primary key to mint atomically with the user. Its `provider_id` and
    /// `provider_user_id` become the key id, and the password (if any) is
    /// hashed before it reaches storage.
    pub key: Option<InitialKey>,
    pub attributes: T,
}

/// The session/key lifecycle engine.
pub struct Auth<T: UserAttributes> {
    adapter: Arc<dyn Adapter>,
    config: Config,
    _attributes: PhantomData<fn() -> T>,
}

impl<T: UserAttributes> fmt::Debug for Auth<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: UserAttributes> Clone for Auth<T> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            config: self.config.clone(),
            _attributes: PhantomData,
        }
    }
}

impl<T: UserAttributes> Auth<T> {
    pub fn new(adapter: Arc<dyn Adapter>, config: Config) -> Self {
        Self {
            adapter,
            config,
            _attributes: PhantomData,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying storage adapter.
    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    // ─── Users ───────────────────────────────────────────────────────

    /// Create a user, optionally together with its primary key.
    ///
    /// The two rows are persisted atomically: when the key id is already
    /// taken, the operation fails with [`LuciaError::DuplicateKeyId`] and
    /// no user row is left behind.
    pub async fn create_user(&self, options: CreateUserOptions<T>) -> Result<User<T>> {
        let user_id = options
            .user_id
            .unwrap_or_else(|| generate_random_string(USER_ID_LENGTH, DEFAULT_ALPHABET));
        let attributes = Self::attributes_to_raw(&options.attributes)?;

        let key = match options.key {
            Some(initial) => {
                let id = key::create_key_id(&initial.provider_id, &initial.provider_user_id)?;
                let hashed_password = match initial.password.as_deref() {
                    Some(password) => Some(hash_password(password)?),
                    None => None,
                };
                Some(KeyRow {
                    id,
                    user_id: user_id.clone(),
                    hashed_password,
                    primary_key: true,
                    expires: None,
                })
            }
            None => None,
        };

        let row = self.adapter.set_user(&user_id, &attributes, key.as_ref()).await?;
        tracing::debug!(user_id = %row.id, "created user");
        self.user_from_row(row)
    }

    /// Fails with [`LuciaError::InvalidUserId`] when the user does not
    /// exist.
    pub async fn get_user(&self, user_id: &str) -> Result<User<T>> {
        let row = self
            .adapter
            .get_user(user_id)
            .await?
            .ok_or(LuciaError::InvalidUserId)?;
        self.user_from_row(row)
    }

    /// Merge the given attribute subset into the stored bag and return the
    /// updated user. Also sweeps the user's dead sessions when auto
    /// cleanup is enabled.
    pub async fn update_user_attributes(
        &self,
        user_id: &str,
        partial: RawUserAttributes,
    ) -> Result<User<T>> {
        let row = self.adapter.update_user_attributes(user_id, &partial).await?;
        if self.config.auto_database_cleanup {
            self.delete_dead_user_sessions(user_id).await?;
        }
        self.user_from_row(row)
    }

    /// Delete a user and everything attached: sessions first, then keys,
    /// then the user row. Safe to call for a user that is already gone.
    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.adapter.delete_sessions_by_user_id(user_id).await?;
        self.adapter.delete_keys_by_user_id(user_id).await?;
        self.adapter.delete_user(user_id).await?;
        tracing::debug!(user_id, "deleted user");
        Ok(())
    }

    // ─── Cookies ─────────────────────────────────────────────────────

    /// Derive the session cookie for a session, or the blank cookie that
    /// clears it when `None`.
    pub fn create_session_cookie(&self, session: Option<&Session>) -> SessionCookie {
        create_session_cookie(session, self.config.env, &self.config.session_cookie)
    }

    // ─── Conversions ─────────────────────────────────────────────────

    fn user_from_row(&self, row: UserRow) -> Result<User<T>> {
        let attributes = serde_json::from_value(serde_json::Value::Object(row.attributes))
            .map_err(|err| {
                LuciaError::Database(
                    anyhow::Error::new(err).context("user attributes failed to deserialize"),
                )
            })?;
        Ok(User {
            user_id: row.id,
            attributes,
        })
    }

    fn attributes_to_raw(attributes: &T) -> Result<RawUserAttributes> {
        match serde_json::to_value(attributes) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(LuciaError::Database(anyhow::anyhow!(
                "user attributes must serialize to a JSON object"
            ))),
            Err(err) => Err(LuciaError::Database(anyhow::Error::new(err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct TestAttributes {
        username: String,
    }

    #[test]
    fn attributes_round_trip_through_the_raw_bag() {
        let attributes = TestAttributes {
            username: "alice".to_string(),
        };
        let raw = Auth::<TestAttributes>::attributes_to_raw(&attributes).unwrap();
        assert_eq!(raw["username"], "alice");
    }

    #[test]
    fn non_object_attributes_are_rejected() {
        // A bare string serializes to a JSON string, not an object.
        let err = Auth::<String>::attributes_to_raw(&"nope".to_string()).unwrap_err();
        assert!(matches!(err, LuciaError::Database(_)));
    }
}
