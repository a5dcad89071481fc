#![doc = include_str!("../README.md")]

// Test tooling: assertion failures are the reporting mechanism, so panics
// and unwraps are fine here.

use rand::distributions::Alphanumeric;
use rand::Rng;

use lucia_core::{Adapter, KeyRow, LuciaError, RawUserAttributes, SessionRow};

// Fixed future timestamps. Adapters store these opaquely; nothing in the
// suite depends on them being in the future or past.
const ACTIVE_EXPIRES: i64 = 1_893_456_000_000;
const IDLE_EXPIRES: i64 = ACTIVE_EXPIRES + 1_000 * 60 * 60 * 24 * 14;

// ─── Row Factories ───────────────────────────────────────────────────

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

/// Fresh unique user id.
pub fn test_user_id() -> String {
    format!("user_{}", random_suffix())
}

/// Attribute bag with a random `username` field.
pub fn test_user_attributes() -> RawUserAttributes {
    let mut attributes = RawUserAttributes::new();
    attributes.insert(
        "username".into(),
        serde_json::json!(format!("username_{}", random_suffix())),
    );
    attributes
}

/// Non-primary password key row for `user_id` with a fresh id.
pub fn test_key(user_id: &str) -> KeyRow {
    KeyRow {
        id: format!("test:{}", random_suffix()),
        user_id: user_id.to_string(),
        hashed_password: Some(format!("hashed_{}", random_suffix())),
        primary_key: false,
        expires: None,
    }
}

/// Session row for `user_id` with a fresh id.
pub fn test_session(user_id: &str) -> SessionRow {
    SessionRow {
        id: format!("session_{}", random_suffix()),
        user_id: user_id.to_string(),
        active_expires: ACTIVE_EXPIRES,
        idle_expires: IDLE_EXPIRES,
    }
}

// ─── Suite ───────────────────────────────────────────────────────────

/// Run the whole conformance suite against an empty store. Panics on the
/// first violation.
pub async fn test_adapter(adapter: &dyn Adapter) {
    test_users(adapter).await;
    test_keys(adapter).await;
    test_sessions(adapter).await;
    test_session_and_user(adapter).await;
    tracing::info!("adapter conformance suite passed");
}

/// User table operations.
pub async fn test_users(adapter: &dyn Adapter) {
    // Missing user reads as None, not an error.
    assert!(
        adapter.get_user("missing_user").await.unwrap().is_none(),
        "get_user on a missing id must return None"
    );

    // Keyless insert round-trips id and attributes.
    let user_id = test_user_id();
    let attributes = test_user_attributes();
    let created = adapter.set_user(&user_id, &attributes, None).await.unwrap();
    assert_eq!(created.id, user_id);
    assert_eq!(created.attributes, attributes);
    let fetched = adapter.get_user(&user_id).await.unwrap();
    assert_eq!(
        fetched.map(|u| u.attributes),
        Some(attributes.clone()),
        "set_user must persist the attribute bag as given"
    );

    // Insert with a key lands both rows.
    let keyed_user_id = test_user_id();
    let mut key = test_key(&keyed_user_id);
    key.primary_key = true;
    adapter
        .set_user(&keyed_user_id, &test_user_attributes(), Some(&key))
        .await
        .unwrap();
    let stored_key = adapter.get_key(&key.id).await.unwrap();
    assert_eq!(
        stored_key.map(|k| k.user_id),
        Some(keyed_user_id.clone()),
        "set_user with a key must store the key"
    );

    // A duplicate key id must fail with DuplicateKeyId and roll the user
    // insert back.
    let loser_id = test_user_id();
    let conflicting = KeyRow {
        user_id: loser_id.clone(),
        ..key.clone()
    };
    let result = adapter
        .set_user(&loser_id, &test_user_attributes(), Some(&conflicting))
        .await;
    assert!(
        matches!(result, Err(LuciaError::DuplicateKeyId)),
        "set_user with a taken key id must fail with DuplicateKeyId, got {result:?}"
    );
    assert!(
        adapter.get_user(&loser_id).await.unwrap().is_none(),
        "a failed set_user must leave no user row behind"
    );

    // Attribute updates merge and return the merged row.
    let mut update = RawUserAttributes::new();
    update.insert("username".into(), serde_json::json!("renamed"));
    let updated = adapter
        .update_user_attributes(&user_id, &update)
        .await
        .unwrap();
    assert_eq!(updated.attributes.get("username"), Some(&serde_json::json!("renamed")));
    let refetched = adapter.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(refetched.attributes.get("username"), Some(&serde_json::json!("renamed")));

    let result = adapter
        .update_user_attributes("missing_user", &update)
        .await;
    assert!(
        matches!(result, Err(LuciaError::InvalidUserId)),
        "update_user_attributes on a missing user must fail with InvalidUserId, got {result:?}"
    );

    // Deletes are targeted and idempotent.
    adapter.delete_user(&user_id).await.unwrap();
    assert!(adapter.get_user(&user_id).await.unwrap().is_none());
    assert!(
        adapter.get_user(&keyed_user_id).await.unwrap().is_some(),
        "delete_user must not touch other users"
    );
    adapter.delete_user(&user_id).await.unwrap();

    adapter.delete_keys_by_user_id(&keyed_user_id).await.unwrap();
    adapter.delete_user(&keyed_user_id).await.unwrap();
    tracing::info!("user operations ok");
}

/// Key table operations and their error mapping.
pub async fn test_keys(adapter: &dyn Adapter) {
    assert!(
        adapter.get_key("missing:key").await.unwrap().is_none(),
        "get_key on a missing id must return None"
    );

    let user_id = test_user_id();
    adapter
        .set_user(&user_id, &test_user_attributes(), None)
        .await
        .unwrap();

    // Password and passwordless keys round-trip every column.
    let with_password = test_key(&user_id);
    adapter.set_key(&with_password).await.unwrap();
    let stored = adapter.get_key(&with_password.id).await.unwrap().unwrap();
    assert_eq!(stored.user_id, with_password.user_id);
    assert_eq!(stored.hashed_password, with_password.hashed_password);
    assert!(!stored.primary_key);
    assert_eq!(stored.expires, None);

    let mut single_use = test_key(&user_id);
    single_use.hashed_password = None;
    single_use.expires = Some(ACTIVE_EXPIRES);
    adapter.set_key(&single_use).await.unwrap();
    let stored = adapter.get_key(&single_use.id).await.unwrap().unwrap();
    assert_eq!(stored.hashed_password, None);
    assert_eq!(stored.expires, Some(ACTIVE_EXPIRES));

    // Inserts validate the user reference and the id uniqueness.
    let orphan = test_key("missing_user");
    let result = adapter.set_key(&orphan).await;
    assert!(
        matches!(result, Err(LuciaError::InvalidUserId)),
        "set_key for a missing user must fail with InvalidUserId, got {result:?}"
    );
    let result = adapter.set_key(&with_password).await;
    assert!(
        matches!(result, Err(LuciaError::DuplicateKeyId)),
        "set_key with a taken id must fail with DuplicateKeyId, got {result:?}"
    );

    // Listing is scoped to the user.
    let other_user_id = test_user_id();
    adapter
        .set_user(&other_user_id, &test_user_attributes(), None)
        .await
        .unwrap();
    let other_key = test_key(&other_user_id);
    adapter.set_key(&other_key).await.unwrap();
    let keys = adapter.get_keys_by_user_id(&user_id).await.unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|k| k.user_id == user_id));
    assert!(
        adapter
            .get_keys_by_user_id("missing_user")
            .await
            .unwrap()
            .is_empty(),
        "get_keys_by_user_id for an unknown user must return an empty list"
    );

    // Password updates overwrite and can clear.
    adapter
        .update_key_password(&with_password.id, Some("rehashed"))
        .await
        .unwrap();
    let stored = adapter.get_key(&with_password.id).await.unwrap().unwrap();
    assert_eq!(stored.hashed_password.as_deref(), Some("rehashed"));
    adapter
        .update_key_password(&with_password.id, None)
        .await
        .unwrap();
    let stored = adapter.get_key(&with_password.id).await.unwrap().unwrap();
    assert_eq!(stored.hashed_password, None);
    let result = adapter.update_key_password("missing:key", None).await;
    assert!(
        matches!(result, Err(LuciaError::InvalidKeyId)),
        "update_key_password on a missing key must fail with InvalidKeyId, got {result:?}"
    );

    // Deletes are targeted and idempotent.
    adapter.delete_key(&single_use.id).await.unwrap();
    assert!(adapter.get_key(&single_use.id).await.unwrap().is_none());
    assert!(adapter.get_key(&with_password.id).await.unwrap().is_some());
    adapter.delete_key(&single_use.id).await.unwrap();

    adapter.delete_keys_by_user_id(&user_id).await.unwrap();
    assert!(adapter.get_keys_by_user_id(&user_id).await.unwrap().is_empty());
    assert!(
        adapter.get_key(&other_key.id).await.unwrap().is_some(),
        "delete_keys_by_user_id must not touch other users' keys"
    );

    adapter.delete_keys_by_user_id(&other_user_id).await.unwrap();
    adapter.delete_user(&user_id).await.unwrap();
    adapter.delete_user(&other_user_id).await.unwrap();
    tracing::info!("key operations ok");
}

/// Session table operations and their error mapping.
pub async fn test_sessions(adapter: &dyn Adapter) {
    assert!(
        adapter.get_session("missing_session").await.unwrap().is_none(),
        "get_session on a missing id must return None"
    );

    let user_id = test_user_id();
    adapter
        .set_user(&user_id, &test_user_attributes(), None)
        .await
        .unwrap();

    let session = test_session(&user_id);
    adapter.set_session(&session).await.unwrap();
    let stored = adapter.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(stored.user_id, user_id);
    assert_eq!(stored.active_expires, session.active_expires);
    assert_eq!(stored.idle_expires, session.idle_expires);

    let orphan = test_session("missing_user");
    let result = adapter.set_session(&orphan).await;
    assert!(
        matches!(result, Err(LuciaError::InvalidUserId)),
        "set_session for a missing user must fail with InvalidUserId, got {result:?}"
    );
    let result = adapter.set_session(&session).await;
    assert!(
        matches!(result, Err(LuciaError::DuplicateSessionId)),
        "set_session with a taken id must fail with DuplicateSessionId, got {result:?}"
    );

    // Listing is scoped to the user.
    let second = test_session(&user_id);
    adapter.set_session(&second).await.unwrap();
    let other_user_id = test_user_id();
    adapter
        .set_user(&other_user_id, &test_user_attributes(), None)
        .await
        .unwrap();
    let other_session = test_session(&other_user_id);
    adapter.set_session(&other_session).await.unwrap();
    let sessions = adapter.get_sessions_by_user_id(&user_id).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s.user_id == user_id));

    // Deletes are targeted and idempotent.
    adapter.delete_session(&session.id).await.unwrap();
    assert!(adapter.get_session(&session.id).await.unwrap().is_none());
    assert!(adapter.get_session(&second.id).await.unwrap().is_some());
    adapter.delete_session(&session.id).await.unwrap();

    adapter.delete_sessions_by_user_id(&user_id).await.unwrap();
    assert!(
        adapter
            .get_sessions_by_user_id(&user_id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        adapter.get_session(&other_session.id).await.unwrap().is_some(),
        "delete_sessions_by_user_id must not touch other users' sessions"
    );

    adapter.delete_sessions_by_user_id(&other_user_id).await.unwrap();
    adapter.delete_user(&user_id).await.unwrap();
    adapter.delete_user(&other_user_id).await.unwrap();
    tracing::info!("session operations ok");
}

/// Combined session-and-user lookup, default or overridden.
pub async fn test_session_and_user(adapter: &dyn Adapter) {
    let user_id = test_user_id();
    let attributes = test_user_attributes();
    adapter.set_user(&user_id, &attributes, None).await.unwrap();
    let session = test_session(&user_id);
    adapter.set_session(&session).await.unwrap();

    let (session_row, user_row) = adapter
        .get_session_and_user(&session.id)
        .await
        .unwrap()
        .expect("combined lookup must find the pair");
    assert_eq!(session_row.id, session.id);
    assert_eq!(session_row.user_id, user_id);
    assert_eq!(user_row.id, user_id);
    assert_eq!(user_row.attributes, attributes);

    assert!(
        adapter
            .get_session_and_user("missing_session")
            .await
            .unwrap()
            .is_none(),
        "combined lookup on a missing session must return None"
    );

    adapter.delete_sessions_by_user_id(&user_id).await.unwrap();
    adapter.delete_user(&user_id).await.unwrap();
    tracing::info!("combined lookup ok");
}
