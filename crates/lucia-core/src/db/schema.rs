// Persisted row shapes shared by every storage adapter.
//
// The snake_case column names (`user_id`, `active_expires`, `idle_expires`,
// `hashed_password`, `primary_key`, `expires`) are a wire contract: existing
// databases were created against these exact spellings, so the field and
// serde names here must never change.

use serde::{Deserialize, Serialize};

/// Application-defined user columns, carried as an opaque bag. The engine
/// never inspects the contents; it only passes them between the caller and
/// the adapter.
pub type RawUserAttributes = serde_json::Map<String, serde_json::Value>;

/// One row of the user table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    /// Extra columns, flattened next to `id` when serialized.
    #[serde(flatten)]
    pub attributes: RawUserAttributes,
}

impl UserRow {
    pub fn new(id: impl Into<String>, attributes: RawUserAttributes) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }
}

/// One row of the key table. The id is `"<provider_id>:<provider_user_id>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRow {
    pub id: String,
    pub user_id: String,
    /// Only present for password-based providers.
    pub hashed_password: Option<String>,
    /// True for the key minted together with its user. Primary keys are
    /// only removed by deleting the user.
    pub primary_key: bool,
    /// Expiration in epoch milliseconds for single-use keys; `None` for
    /// persistent keys.
    pub expires: Option<i64>,
}

/// One row of the session table. Both timestamps are epoch milliseconds;
/// `idle_expires` is always strictly greater than `active_expires`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub active_expires: i64,
    pub idle_expires: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_row_flattens_attributes() {
        let mut attributes = RawUserAttributes::new();
        attributes.insert("username".into(), "alice".into());
        let row = UserRow::new("user1", attributes);

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], "user1");
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn key_row_keeps_wire_column_names() {
        let row = KeyRow {
            id: "email:a@b.com".into(),
            user_id: "user1".into(),
            hashed_password: None,
            primary_key: true,
            expires: None,
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["user_id"], "user1");
        assert_eq!(json["primary_key"], true);
        assert!(json["hashed_password"].is_null());
    }

    #[test]
    fn session_row_round_trips() {
        let row = SessionRow {
            id: "abc".into(),
            user_id: "user1".into(),
            active_expires: 1_000,
            idle_expires: 2_000,
        };

        let json = serde_json::to_string(&row).unwrap();
        let back: SessionRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back.active_expires, 1_000);
        assert_eq!(back.idle_expires, 2_000);
    }
}
