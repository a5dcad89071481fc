// SQL adapter over sqlx::Any. `?` placeholders throughout; the Any driver
// rewrites them per backend.
//
// SQLite leaves foreign keys off unless every connection opts in, so the
// user-existence checks the engine depends on are explicit SELECTs rather
// than trust in the constraint. Where the constraint does fire it is still
// mapped correctly.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};

use lucia_core::{
    Adapter, AdapterResult, KeyRow, LuciaError, RawUserAttributes, SessionRow, UserRow,
};

// Applied by `migrate`, statement by statement. Attributes are stored as a
// JSON text column so application-defined user fields need no schema
// changes here.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS auth_user (
        id TEXT PRIMARY KEY,
        attributes TEXT NOT NULL DEFAULT '{}'
    )",
    "CREATE TABLE IF NOT EXISTS auth_key (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES auth_user(id),
        hashed_password TEXT,
        primary_key BIGINT NOT NULL DEFAULT 0,
        expires BIGINT
    )",
    "CREATE TABLE IF NOT EXISTS auth_session (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES auth_user(id),
        active_expires BIGINT NOT NULL,
        idle_expires BIGINT NOT NULL
    )",
];

/// SQL storage adapter backed by an [`AnyPool`].
#[derive(Debug, Clone)]
pub struct SqlxAdapter {
    pool: AnyPool,
}

impl SqlxAdapter {
    /// Wrap an existing pool.
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Connect to a database url.
    ///
    /// Every connection to an in-memory SQLite url opens a distinct
    /// database, so those pools are capped at a single connection.
    pub async fn connect(url: &str) -> AdapterResult<Self> {
        sqlx::any::install_default_drivers();
        let pool = if url.contains(":memory:") || url.contains("mode=memory") {
            AnyPoolOptions::new().max_connections(1).connect(url).await
        } else {
            AnyPool::connect(url).await
        }
        .map_err(wrap)?;
        Ok(Self { pool })
    }

    /// The underlying pool, for callers that run their own queries.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Create the auth tables when they are missing. Safe to run on every
    /// startup.
    pub async fn migrate(&self) -> AdapterResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(wrap)?;
        }
        tracing::debug!("auth schema up to date");
        Ok(())
    }

    async fn ensure_user_exists(&self, user_id: &str) -> AdapterResult<()> {
        let row = sqlx::query("SELECT id FROM auth_user WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(wrap)?;
        if row.is_none() {
            return Err(LuciaError::InvalidUserId);
        }
        Ok(())
    }
}

// ─── Row Decoding ────────────────────────────────────────────────────

fn decode_user_row(row: &AnyRow) -> AdapterResult<UserRow> {
    let id: String = row.try_get("id").map_err(wrap)?;
    let attributes = decode_attributes(row)?;
    Ok(UserRow::new(id, attributes))
}

fn decode_attributes(row: &AnyRow) -> AdapterResult<RawUserAttributes> {
    let raw: String = row.try_get("attributes").map_err(wrap)?;
    serde_json::from_str(&raw)
        .map_err(|err| LuciaError::Database(anyhow!("attributes column holds invalid json: {err}")))
}

fn decode_key_row(row: &AnyRow) -> AdapterResult<KeyRow> {
    Ok(KeyRow {
        id: row.try_get("id").map_err(wrap)?,
        user_id: row.try_get("user_id").map_err(wrap)?,
        hashed_password: row.try_get("hashed_password").map_err(wrap)?,
        primary_key: decode_flag(row, "primary_key")?,
        expires: row.try_get("expires").map_err(wrap)?,
    })
}

fn decode_session_row(row: &AnyRow) -> AdapterResult<SessionRow> {
    Ok(SessionRow {
        id: row.try_get("id").map_err(wrap)?,
        user_id: row.try_get("user_id").map_err(wrap)?,
        active_expires: row.try_get("active_expires").map_err(wrap)?,
        idle_expires: row.try_get("idle_expires").map_err(wrap)?,
    })
}

// Integer-affinity boolean; backends disagree on the reported width.
fn decode_flag(row: &AnyRow, column: &str) -> AdapterResult<bool> {
    if let Ok(wide) = row.try_get::<i64, _>(column) {
        return Ok(wide != 0);
    }
    let narrow = row.try_get::<i32, _>(column).map_err(wrap)?;
    Ok(narrow != 0)
}

// ─── Error Mapping ───────────────────────────────────────────────────

fn wrap(err: sqlx::Error) -> LuciaError {
    LuciaError::Database(err.into())
}

fn map_insert_error(err: sqlx::Error, duplicate: LuciaError) -> LuciaError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => duplicate,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => LuciaError::InvalidUserId,
        _ => wrap(err),
    }
}

fn encode_attributes(attributes: &RawUserAttributes) -> AdapterResult<String> {
    serde_json::to_string(attributes)
        .map_err(|err| LuciaError::Database(anyhow!("user attributes did not serialize: {err}")))
}

#[async_trait]
impl Adapter for SqlxAdapter {
    // ─── User ────────────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> AdapterResult<Option<UserRow>> {
        let row = sqlx::query("SELECT id, attributes FROM auth_user WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(wrap)?;
        row.as_ref().map(decode_user_row).transpose()
    }

    async fn set_user(
        &self,
        user_id: &str,
        attributes: &RawUserAttributes,
        key: Option<&KeyRow>,
    ) -> AdapterResult<UserRow> {
        let attributes_json = encode_attributes(attributes)?;
        let mut tx = self.pool.begin().await.map_err(wrap)?;
        sqlx::query("INSERT INTO auth_user (id, attributes) VALUES (?, ?)")
            .bind(user_id)
            .bind(&attributes_json)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?;
        if let Some(key) = key {
            sqlx::query(
                "INSERT INTO auth_key (id, user_id, hashed_password, primary_key, expires) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&key.id)
            .bind(&key.user_id)
            .bind(key.hashed_password.as_deref())
            .bind(i64::from(key.primary_key))
            .bind(key.expires)
            .execute(&mut *tx)
            .await
            .map_err(|err| map_insert_error(err, LuciaError::DuplicateKeyId))?;
        }
        tx.commit().await.map_err(wrap)?;
        Ok(UserRow::new(user_id, attributes.clone()))
    }

    async fn update_user_attributes(
        &self,
        user_id: &str,
        attributes: &RawUserAttributes,
    ) -> AdapterResult<UserRow> {
        // Read-modify-write inside a transaction: the merge happens here,
        // not in SQL, so concurrent merges of different fields keep the
        // last committed state consistent.
        let mut tx = self.pool.begin().await.map_err(wrap)?;
        let row = sqlx::query("SELECT id, attributes FROM auth_user WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(wrap)?;
        let Some(row) = row else {
            return Err(LuciaError::InvalidUserId);
        };
        let mut user = decode_user_row(&row)?;
        for (field, value) in attributes {
            user.attributes.insert(field.clone(), value.clone());
        }
        let attributes_json = encode_attributes(&user.attributes)?;
        sqlx::query("UPDATE auth_user SET attributes = ? WHERE id = ?")
            .bind(&attributes_json)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?;
        tx.commit().await.map_err(wrap)?;
        Ok(user)
    }

    async fn delete_user(&self, user_id: &str) -> AdapterResult<()> {
        sqlx::query("DELETE FROM auth_user WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(wrap)?;
        Ok(())
    }

    // ─── Key ─────────────────────────────────────────────────────────

    async fn get_key(&self, key_id: &str) -> AdapterResult<Option<KeyRow>> {
        let row = sqlx::query(
            "SELECT id, user_id, hashed_password, primary_key, expires \
             FROM auth_key WHERE id = ?",
        )
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(wrap)?;
        row.as_ref().map(decode_key_row).transpose()
    }

    async fn get_keys_by_user_id(&self, user_id: &str) -> AdapterResult<Vec<KeyRow>> {
        let rows = sqlx::query(
            "SELECT id, user_id, hashed_password, primary_key, expires \
             FROM auth_key WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(wrap)?;
        rows.iter().map(decode_key_row).collect()
    }

    async fn set_key(&self, key: &KeyRow) -> AdapterResult<()> {
        self.ensure_user_exists(&key.user_id).await?;
        sqlx::query(
            "INSERT INTO auth_key (id, user_id, hashed_password, primary_key, expires) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&key.id)
        .bind(&key.user_id)
        .bind(key.hashed_password.as_deref())
        .bind(i64::from(key.primary_key))
        .bind(key.expires)
        .execute(&self.pool)
        .await
        .map_err(|err| map_insert_error(err, LuciaError::DuplicateKeyId))?;
        Ok(())
    }

    async fn update_key_password(
        &self,
        key_id: &str,
        hashed_password: Option<&str>,
    ) -> AdapterResult<()> {
        let result = sqlx::query("UPDATE auth_key SET hashed_password = ? WHERE id = ?")
            .bind(hashed_password)
            .bind(key_id)
            .execute(&self.pool)
            .await
            .map_err(wrap)?;
        if result.rows_affected() == 0 {
            return Err(LuciaError::InvalidKeyId);
        }
        Ok(())
    }

    async fn delete_key(&self, key_id: &str) -> AdapterResult<()> {
        sqlx::query("DELETE FROM auth_key WHERE id = ?")
            .bind(key_id)
            .execute(&self.pool)
            .await
            .map_err(wrap)?;
        Ok(())
    }

    async fn delete_keys_by_user_id(&self, user_id: &str) -> AdapterResult<()> {
        sqlx::query("DELETE FROM auth_key WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(wrap)?;
        Ok(())
    }

    // ─── Session ─────────────────────────────────────────────────────

    async fn get_session(&self, session_id: &str) -> AdapterResult<Option<SessionRow>> {
        let row = sqlx::query(
            "SELECT id, user_id, active_expires, idle_expires \
             FROM auth_session WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(wrap)?;
        row.as_ref().map(decode_session_row).transpose()
    }

    async fn get_sessions_by_user_id(&self, user_id: &str) -> AdapterResult<Vec<SessionRow>> {
        let rows = sqlx::query(
            "SELECT id, user_id, active_expires, idle_expires \
             FROM auth_session WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(wrap)?;
        rows.iter().map(decode_session_row).collect()
    }

    async fn set_session(&self, session: &SessionRow) -> AdapterResult<()> {
        self.ensure_user_exists(&session.user_id).await?;
        sqlx::query(
            "INSERT INTO auth_session (id, user_id, active_expires, idle_expires) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.active_expires)
        .bind(session.idle_expires)
        .execute(&self.pool)
        .await
        .map_err(|err| map_insert_error(err, LuciaError::DuplicateSessionId))?;
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> AdapterResult<()> {
        sqlx::query("DELETE FROM auth_session WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(wrap)?;
        Ok(())
    }

    async fn delete_sessions_by_user_id(&self, user_id: &str) -> AdapterResult<()> {
        sqlx::query("DELETE FROM auth_session WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(wrap)?;
        Ok(())
    }

    // Single joined query instead of the default's two reads.
    async fn get_session_and_user(
        &self,
        session_id: &str,
    ) -> AdapterResult<Option<(SessionRow, UserRow)>> {
        let row = sqlx::query(
            "SELECT s.id, s.user_id, s.active_expires, s.idle_expires, u.attributes \
             FROM auth_session s \
             INNER JOIN auth_user u ON u.id = s.user_id \
             WHERE s.id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(wrap)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let session = decode_session_row(&row)?;
        let attributes = decode_attributes(&row)?;
        let user = UserRow::new(session.user_id.clone(), attributes);
        Ok(Some((session, user)))
    }
}
