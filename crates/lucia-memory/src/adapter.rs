// HashMap-backed adapter. One RwLock guards all three tables so that
// multi-row operations (user plus primary key) stay atomic without a
// transaction machinery.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::RwLock;

use lucia_core::{
    Adapter, AdapterResult, KeyRow, LuciaError, RawUserAttributes, SessionRow, UserRow,
};

#[derive(Debug, Default)]
struct Store {
    users: HashMap<String, UserRow>,
    keys: HashMap<String, KeyRow>,
    sessions: HashMap<String, SessionRow>,
}

/// In-memory storage adapter.
///
/// Clones share the underlying store, so a handle held by a test observes
/// everything the engine writes through its own clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    store: Arc<RwLock<Store>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows, sorted by id. For test assertions.
    pub async fn snapshot(&self) -> (Vec<UserRow>, Vec<KeyRow>, Vec<SessionRow>) {
        let store = self.store.read().await;
        let mut users: Vec<_> = store.users.values().cloned().collect();
        let mut keys: Vec<_> = store.keys.values().cloned().collect();
        let mut sessions: Vec<_> = store.sessions.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        keys.sort_by(|a, b| a.id.cmp(&b.id));
        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        (users, keys, sessions)
    }

    /// Drop every row.
    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        store.users.clear();
        store.keys.clear();
        store.sessions.clear();
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    // ─── User ────────────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> AdapterResult<Option<UserRow>> {
        let store = self.store.read().await;
        Ok(store.users.get(user_id).cloned())
    }

    async fn set_user(
        &self,
        user_id: &str,
        attributes: &RawUserAttributes,
        key: Option<&KeyRow>,
    ) -> AdapterResult<UserRow> {
        let mut store = self.store.write().await;
        if store.users.contains_key(user_id) {
            return Err(LuciaError::Database(anyhow!(
                "user id already exists: {user_id}"
            )));
        }
        // Reject the key before touching the user table: a failed insert
        // must leave no user row behind.
        if let Some(key) = key {
            if store.keys.contains_key(&key.id) {
                return Err(LuciaError::DuplicateKeyId);
            }
        }

        let user = UserRow::new(user_id, attributes.clone());
        store.users.insert(user_id.to_string(), user.clone());
        if let Some(key) = key {
            store.keys.insert(key.id.clone(), key.clone());
        }
        Ok(user)
    }

    async fn update_user_attributes(
        &self,
        user_id: &str,
        attributes: &RawUserAttributes,
    ) -> AdapterResult<UserRow> {
        let mut store = self.store.write().await;
        let user = store
            .users
            .get_mut(user_id)
            .ok_or(LuciaError::InvalidUserId)?;
        for (field, value) in attributes {
            user.attributes.insert(field.clone(), value.clone());
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        store.users.remove(user_id);
        Ok(())
    }

    // ─── Key ─────────────────────────────────────────────────────────

    async fn get_key(&self, key_id: &str) -> AdapterResult<Option<KeyRow>> {
        let store = self.store.read().await;
        Ok(store.keys.get(key_id).cloned())
    }

    async fn get_keys_by_user_id(&self, user_id: &str) -> AdapterResult<Vec<KeyRow>> {
        let store = self.store.read().await;
        Ok(store
            .keys
            .values()
            .filter(|key| key.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_key(&self, key: &KeyRow) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        if !store.users.contains_key(&key.user_id) {
            return Err(LuciaError::InvalidUserId);
        }
        if store.keys.contains_key(&key.id) {
            return Err(LuciaError::DuplicateKeyId);
        }
        store.keys.insert(key.id.clone(), key.clone());
        Ok(())
    }

    async fn update_key_password(
        &self,
        key_id: &str,
        hashed_password: Option<&str>,
    ) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        let key = store.keys.get_mut(key_id).ok_or(LuciaError::InvalidKeyId)?;
        key.hashed_password = hashed_password.map(str::to_string);
        Ok(())
    }

    async fn delete_key(&self, key_id: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        store.keys.remove(key_id);
        Ok(())
    }

    async fn delete_keys_by_user_id(&self, user_id: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        store.keys.retain(|_, key| key.user_id != user_id);
        Ok(())
    }

    // ─── Session ─────────────────────────────────────────────────────

    async fn get_session(&self, session_id: &str) -> AdapterResult<Option<SessionRow>> {
        let store = self.store.read().await;
        Ok(store.sessions.get(session_id).cloned())
    }

    async fn get_sessions_by_user_id(&self, user_id: &str) -> AdapterResult<Vec<SessionRow>> {
        let store = self.store.read().await;
        Ok(store
            .sessions
            .values()
            .filter(|session| session.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_session(&self, session: &SessionRow) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        if !store.users.contains_key(&session.user_id) {
            return Err(LuciaError::InvalidUserId);
        }
        if store.sessions.contains_key(&session.id) {
            return Err(LuciaError::DuplicateSessionId);
        }
        store.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        store.sessions.remove(session_id);
        Ok(())
    }

    async fn delete_sessions_by_user_id(&self, user_id: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        store.sessions.retain(|_, session| session.user_id != user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(username: &str) -> RawUserAttributes {
        let mut map = RawUserAttributes::new();
        map.insert("username".into(), serde_json::json!(username));
        map
    }

    fn key_row(id: &str, user_id: &str) -> KeyRow {
        KeyRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            hashed_password: None,
            primary_key: true,
            expires: None,
        }
    }

    #[tokio::test]
    async fn duplicate_key_insert_leaves_no_user_behind() {
        let adapter = MemoryAdapter::new();
        adapter
            .set_user("user1", &attributes("alice"), Some(&key_row("email:a", "user1")))
            .await
            .unwrap();

        let result = adapter
            .set_user("user2", &attributes("bob"), Some(&key_row("email:a", "user2")))
            .await;
        assert!(matches!(result, Err(LuciaError::DuplicateKeyId)));

        let (users, keys, _) = adapter.snapshot().await;
        assert_eq!(users.len(), 1);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].user_id, "user1");
    }

    #[tokio::test]
    async fn snapshot_is_sorted_and_clear_empties_the_store() {
        let adapter = MemoryAdapter::new();
        adapter.set_user("b", &attributes("b"), None).await.unwrap();
        adapter.set_user("a", &attributes("a"), None).await.unwrap();

        let (users, _, _) = adapter.snapshot().await;
        assert_eq!(users[0].id, "a");
        assert_eq!(users[1].id, "b");

        adapter.clear().await;
        let (users, keys, sessions) = adapter.snapshot().await;
        assert!(users.is_empty() && keys.is_empty() && sessions.is_empty());
    }

    #[tokio::test]
    async fn clones_share_the_store() {
        let adapter = MemoryAdapter::new();
        let clone = adapter.clone();
        adapter.set_user("user1", &attributes("alice"), None).await.unwrap();

        assert!(clone.get_user("user1").await.unwrap().is_some());
    }
}
