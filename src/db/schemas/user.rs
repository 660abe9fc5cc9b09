//! User document schema
//!
//! Stores login credentials. The document ID doubles as the owner ID of the
//! user's saved predictions.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for users
pub const USER_COLLECTION: &str = "usuarios";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Unique login name
    pub username: String,

    /// Password hash; older accounts stored it under `password`
    #[serde(alias = "password")]
    pub password_hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl UserDoc {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            _id: None,
            username,
            password_hash,
            created_at: Some(DateTime::now()),
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "username": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("username_unique".to_string())
                    .build(),
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_document_reads_password_field() {
        let id = ObjectId::new();
        let user: UserDoc = bson::from_document(doc! {
            "_id": id,
            "username": "ana",
            "password": "$2b$12$abc",
            "created_at": DateTime::now(),
        })
        .unwrap();

        assert_eq!(user._id, Some(id));
        assert_eq!(user.password_hash, "$2b$12$abc");
    }

    #[test]
    fn test_new_document_writes_password_hash() {
        let doc = bson::to_document(&UserDoc::new("ana".into(), "$argon2id$x".into())).unwrap();
        assert_eq!(doc.get_str("password_hash").unwrap(), "$argon2id$x");
        assert!(!doc.contains_key("password"));
        assert!(!doc.contains_key("_id"));
    }
}
