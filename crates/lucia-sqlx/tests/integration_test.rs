use lucia_adapter_test::{test_session, test_user_attributes, test_user_id};
use lucia_sqlx::SqlxAdapter;

// Each test connects to its own in-memory SQLite database.
async fn setup_adapter() -> SqlxAdapter {
    let adapter = SqlxAdapter::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should connect");
    adapter.migrate().await.expect("migration should succeed");
    adapter
}

#[tokio::test]
async fn passes_the_adapter_suite() {
    let adapter = setup_adapter().await;
    lucia_adapter_test::test_adapter(&adapter).await;
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let adapter = setup_adapter().await;
    adapter.migrate().await.unwrap();
    adapter.migrate().await.unwrap();
}

#[tokio::test]
async fn combined_lookup_joins_session_and_user() {
    use lucia_core::Adapter;

    let adapter = setup_adapter().await;
    let user_id = test_user_id();
    let attributes = test_user_attributes();
    adapter.set_user(&user_id, &attributes, None).await.unwrap();
    let session = test_session(&user_id);
    adapter.set_session(&session).await.unwrap();

    let (session_row, user_row) = adapter
        .get_session_and_user(&session.id)
        .await
        .unwrap()
        .expect("pair should be found");
    assert_eq!(session_row.id, session.id);
    assert_eq!(user_row.id, user_id);
    assert_eq!(user_row.attributes, attributes);
}

#[tokio::test]
async fn attributes_survive_the_text_column() {
    use lucia_core::Adapter;

    let adapter = setup_adapter().await;
    let mut attributes = lucia_core::RawUserAttributes::new();
    attributes.insert("username".into(), serde_json::json!("alice"));
    attributes.insert("age".into(), serde_json::json!(42));
    attributes.insert("admin".into(), serde_json::json!(false));
    attributes.insert("nickname".into(), serde_json::json!(null));

    adapter.set_user("user1", &attributes, None).await.unwrap();
    let stored = adapter.get_user("user1").await.unwrap().unwrap();
    assert_eq!(stored.attributes, attributes);
}
