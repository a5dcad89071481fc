// Storage adapter contract.
//
// Each backend implements this trait once and the engine is written against
// it alone. Concurrency correctness lives behind this boundary: when two
// inserts race on the same id, the backend's uniqueness constraint decides
// the winner and the loser must surface as `DuplicateKeyId` /
// `DuplicateSessionId`, never as a raw driver error.

use std::fmt;

use async_trait::async_trait;

use crate::db::schema::{KeyRow, RawUserAttributes, SessionRow, UserRow};
use crate::error::LuciaError;

/// Result type for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, LuciaError>;

/// The storage interface consumed by the auth engine.
///
/// Error mapping rules for implementors:
/// - uniqueness violation on a key insert → [`LuciaError::DuplicateKeyId`]
/// - uniqueness violation on a session insert → [`LuciaError::DuplicateSessionId`]
/// - insert referencing a missing user → [`LuciaError::InvalidUserId`]
/// - anything else → [`LuciaError::Database`], untouched
///
/// Deletes are best-effort: deleting a row that does not exist is not an
/// error. Lookups return `Ok(None)` for missing rows and reserve `Err` for
/// backend failures.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    // ─── User ────────────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> AdapterResult<Option<UserRow>>;

    /// Insert a user, optionally together with its first key. When a key is
    /// given, both rows must land or neither: a duplicate key id must leave
    /// no user row behind.
    async fn set_user(
        &self,
        user_id: &str,
        attributes: &RawUserAttributes,
        key: Option<&KeyRow>,
    ) -> AdapterResult<UserRow>;

    /// Merge the given attributes into the user row and return the updated
    /// row. Fails with [`LuciaError::InvalidUserId`] when the user is gone.
    async fn update_user_attributes(
        &self,
        user_id: &str,
        attributes: &RawUserAttributes,
    ) -> AdapterResult<UserRow>;

    async fn delete_user(&self, user_id: &str) -> AdapterResult<()>;

    // ─── Key ─────────────────────────────────────────────────────────

    async fn get_key(&self, key_id: &str) -> AdapterResult<Option<KeyRow>>;

    async fn get_keys_by_user_id(&self, user_id: &str) -> AdapterResult<Vec<KeyRow>>;

    async fn set_key(&self, key: &KeyRow) -> AdapterResult<()>;

    /// Overwrite the stored password hash. `None` clears it, turning the
    /// key into a passwordless one. Fails with [`LuciaError::InvalidKeyId`]
    /// when no such key exists.
    async fn update_key_password(
        &self,
        key_id: &str,
        hashed_password: Option<&str>,
    ) -> AdapterResult<()>;

    async fn delete_key(&self, key_id: &str) -> AdapterResult<()>;

    async fn delete_keys_by_user_id(&self, user_id: &str) -> AdapterResult<()>;

    // ─── Session ─────────────────────────────────────────────────────

    async fn get_session(&self, session_id: &str) -> AdapterResult<Option<SessionRow>>;

    async fn get_sessions_by_user_id(&self, user_id: &str) -> AdapterResult<Vec<SessionRow>>;

    async fn set_session(&self, session: &SessionRow) -> AdapterResult<()>;

    async fn delete_session(&self, session_id: &str) -> AdapterResult<()>;

    async fn delete_sessions_by_user_id(&self, user_id: &str) -> AdapterResult<()>;

    /// Combined lookup used on the hot path of request validation. The
    /// default issues two sequential reads; backends that can join should
    /// override it with a single query.
    async fn get_session_and_user(
        &self,
        session_id: &str,
    ) -> AdapterResult<Option<(SessionRow, UserRow)>> {
        let Some(session) = self.get_session(session_id).await? else {
            return Ok(None);
        };
        let Some(user) = self.get_user(&session.user_id).await? else {
            return Ok(None);
        };
        Ok(Some((session, user)))
    }
}
