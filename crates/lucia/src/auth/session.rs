// Session lifecycle: the active/idle/dead state machine, issuance,
// validation, and renewal.
//
// A session is trusted outright while `now < active_expires`, renewable
// until `idle_expires`, and indistinguishable from a missing session after
// that. Renewal never extends a row in place: it mints a replacement and
// then deletes the original, so a failure in between can only leave an
// extra live session, never a user with none.

use chrono::Utc;

use lucia_core::{LuciaError, Result, SessionRow};

use crate::auth::{Auth, User, UserAttributes};
use crate::crypto::{generate_random_string, DEFAULT_ALPHABET};

/// Session ids are 40 characters from the default alphabet. Ids of any
/// other length are rejected before the adapter is consulted.
pub const SESSION_ID_LENGTH: usize = 40;

/// Lifecycle position of a session relative to its two expiry instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// `now < active_expires`: trusted as-is.
    Active,
    /// `active_expires <= now < idle_expires`: stale but renewable.
    Idle,
    /// `now >= idle_expires`: treated exactly like a missing session.
    Dead,
}

impl SessionState {
    /// Classify a session at `now` (all epoch milliseconds). Total for any
    /// ordering of the inputs; the dead check wins when the windows
    /// degenerate.
    pub fn of(active_expires: i64, idle_expires: i64, now: i64) -> Self {
        if now >= idle_expires {
            SessionState::Dead
        } else if now < active_expires {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }
}

/// A validated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    /// End of the fully-trusted window, epoch milliseconds.
    pub active_expires: i64,
    /// End of the renewable window, epoch milliseconds.
    pub idle_expires: i64,
    /// State at the time the session was read. Never [`SessionState::Dead`]:
    /// dead sessions surface as [`LuciaError::InvalidSessionId`] instead.
    pub state: SessionState,
    /// True when the session was just created or renewed and the caller
    /// should issue a new cookie.
    pub fresh: bool,
}

impl Session {
    /// `None` when the row is dead at `now`.
    fn from_row(row: SessionRow, now: i64, fresh: bool) -> Option<Self> {
        let state = SessionState::of(row.active_expires, row.idle_expires, now);
        if state == SessionState::Dead {
            return None;
        }
        Some(Self {
            session_id: row.id,
            user_id: row.user_id,
            active_expires: row.active_expires,
            idle_expires: row.idle_expires,
            state,
            fresh,
        })
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl<T: UserAttributes> Auth<T> {
    // ─── Sessions ────────────────────────────────────────────────────

    /// Issue a new session for a user.
    ///
    /// The id is freshly generated and both expiry windows start from now.
    /// Fails with [`LuciaError::InvalidUserId`] when the user does not
    /// exist, or [`LuciaError::DuplicateSessionId`] if the generated id
    /// collides with an existing row.
    pub async fn create_session(&self, user_id: &str) -> Result<Session> {
        let now = now_ms();
        let session_id = generate_random_string(SESSION_ID_LENGTH, DEFAULT_ALPHABET);
        let active_expires = now + self.config.active_period;
        let idle_expires = active_expires + self.config.idle_period;

        let row = SessionRow {
            id: session_id.clone(),
            user_id: user_id.to_string(),
            active_expires,
            idle_expires,
        };
        self.adapter.set_session(&row).await?;
        if self.config.auto_database_cleanup {
            self.delete_dead_user_sessions(user_id).await?;
        }
        tracing::debug!(user_id, session_id = %session_id, "created session");

        Ok(Session {
            session_id,
            user_id: user_id.to_string(),
            active_expires,
            idle_expires,
            state: SessionState::Active,
            fresh: true,
        })
    }

    /// Look up a session without renewing it. Idle sessions pass; dead and
    /// unknown ids both fail with [`LuciaError::InvalidSessionId`].
    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        if session_id.len() != SESSION_ID_LENGTH {
            return Err(LuciaError::InvalidSessionId);
        }
        let row = self
            .adapter
            .get_session(session_id)
            .await?
            .ok_or(LuciaError::InvalidSessionId)?;
        match Session::from_row(row, now_ms(), false) {
            Some(session) => Ok(session),
            None => {
                if self.config.auto_database_cleanup {
                    self.adapter.delete_session(session_id).await?;
                }
                Err(LuciaError::InvalidSessionId)
            }
        }
    }

    /// Validate a session, renewing it when it has gone idle.
    ///
    /// The returned session is the caller's new source of truth: after a
    /// renewal it carries a fresh id and `fresh = true`, and the old id
    /// stops resolving.
    pub async fn validate_session(&self, session_id: &str) -> Result<Session> {
        let session = self.get_session(session_id).await?;
        if session.state == SessionState::Active {
            return Ok(session);
        }
        self.renew_session(session_id).await
    }

    /// Replace a live session with a fresh one for the same user.
    ///
    /// The replacement is created before the original is deleted; retrying
    /// after a partial failure is safe.
    pub async fn renew_session(&self, session_id: &str) -> Result<Session> {
        let session = self.get_session(session_id).await?;
        let renewed = self.create_session(&session.user_id).await?;
        self.adapter.delete_session(session_id).await?;
        tracing::debug!(
            user_id = %renewed.user_id,
            old_session_id = session_id,
            session_id = %renewed.session_id,
            "renewed session"
        );
        Ok(renewed)
    }

    /// All live (active or idle) sessions of a user; dead rows are skipped.
    pub async fn get_all_user_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        let rows = self.adapter.get_sessions_by_user_id(user_id).await?;
        let now = now_ms();
        Ok(rows
            .into_iter()
            .filter_map(|row| Session::from_row(row, now, false))
            .collect())
    }

    /// Delete one session. Succeeds whether or not it exists.
    pub async fn invalidate_session(&self, session_id: &str) -> Result<()> {
        self.adapter.delete_session(session_id).await?;
        tracing::debug!(session_id, "invalidated session");
        Ok(())
    }

    /// Delete every session of a user (sign out everywhere).
    pub async fn invalidate_all_user_sessions(&self, user_id: &str) -> Result<()> {
        self.adapter.delete_sessions_by_user_id(user_id).await?;
        tracing::debug!(user_id, "invalidated all user sessions");
        Ok(())
    }

    /// Delete the user's sessions whose idle window has passed. Runs on
    /// its own or opportunistically from other operations when auto
    /// cleanup is enabled.
    pub async fn delete_dead_user_sessions(&self, user_id: &str) -> Result<()> {
        let rows = self.adapter.get_sessions_by_user_id(user_id).await?;
        let now = now_ms();
        for row in rows {
            if SessionState::of(row.active_expires, row.idle_expires, now) == SessionState::Dead {
                self.adapter.delete_session(&row.id).await?;
            }
        }
        Ok(())
    }

    // ─── Combined Lookups ────────────────────────────────────────────

    /// Session and owning user in one adapter round trip, without renewal.
    pub async fn get_session_user(&self, session_id: &str) -> Result<(Session, User<T>)> {
        if session_id.len() != SESSION_ID_LENGTH {
            return Err(LuciaError::InvalidSessionId);
        }
        let Some((session_row, user_row)) = self.adapter.get_session_and_user(session_id).await?
        else {
            return Err(LuciaError::InvalidSessionId);
        };
        match Session::from_row(session_row, now_ms(), false) {
            Some(session) => Ok((session, self.user_from_row(user_row)?)),
            None => {
                if self.config.auto_database_cleanup {
                    self.adapter.delete_session(session_id).await?;
                }
                Err(LuciaError::InvalidSessionId)
            }
        }
    }

    /// Combined lookup with renewal, mirroring [`Auth::validate_session`].
    pub async fn validate_session_user(&self, session_id: &str) -> Result<(Session, User<T>)> {
        let (session, user) = self.get_session_user(session_id).await?;
        if session.state == SessionState::Active {
            return Ok((session, user));
        }
        let renewed = self.renew_session(session_id).await?;
        Ok((renewed, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_active_before_the_active_boundary() {
        assert_eq!(SessionState::of(100, 200, 0), SessionState::Active);
        assert_eq!(SessionState::of(100, 200, 99), SessionState::Active);
    }

    #[test]
    fn active_boundary_is_exclusive() {
        // At exactly `active_expires` the session is already idle.
        assert_eq!(SessionState::of(100, 200, 100), SessionState::Idle);
        assert_eq!(SessionState::of(100, 200, 199), SessionState::Idle);
    }

    #[test]
    fn idle_boundary_is_inclusive_for_dead() {
        // At exactly `idle_expires` the session is dead.
        assert_eq!(SessionState::of(100, 200, 200), SessionState::Dead);
        assert_eq!(SessionState::of(100, 200, 1_000), SessionState::Dead);
    }

    #[test]
    fn degenerate_windows_are_dead_first() {
        // idle <= active should never happen, but classification stays total.
        assert_eq!(SessionState::of(200, 100, 150), SessionState::Dead);
        assert_eq!(SessionState::of(200, 100, 50), SessionState::Active);
    }

    #[test]
    fn dead_rows_produce_no_session() {
        let row = SessionRow {
            id: "x".repeat(40),
            user_id: "user1".to_string(),
            active_expires: 100,
            idle_expires: 200,
        };
        assert!(Session::from_row(row.clone(), 200, false).is_none());

        let session = Session::from_row(row, 150, false).unwrap();
        assert_eq!(session.state, SessionState::Idle);
        assert!(!session.fresh);
    }
}
