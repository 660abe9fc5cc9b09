//! Account storage
//!
//! Usernames are unique. The account id is handed out as the `sub` claim of
//! issued tokens and becomes the owner id of saved predictions.

use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, SubsecRound, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::debug;

use crate::db::mongo::{is_duplicate_key, MongoClient, MongoCollection};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::history::new_record_id;
use crate::types::{PolicyError, Result};

/// Message returned when a username is already registered
pub const DUPLICATE_USER_MESSAGE: &str = "Usuario ya existe";

#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Create an account; `Conflict` if the username is taken
    async fn create(&self, username: &str, password_hash: String) -> Result<UserAccount>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>>;
}

fn duplicate_user() -> PolicyError {
    PolicyError::Conflict(DUPLICATE_USER_MESSAGE.to_string())
}

/// In-process accounts keyed by username
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<String, UserAccount>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, username: &str, password_hash: String) -> Result<UserAccount> {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(duplicate_user()),
            Entry::Vacant(slot) => {
                let account = UserAccount {
                    id: new_record_id(),
                    username: username.to_string(),
                    password_hash,
                    created_at: Utc::now().trunc_subsecs(3),
                };
                slot.insert(account.clone());
                debug!(username, id = %account.id, "Account created");
                Ok(account)
            }
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>> {
        Ok(self.users.get(username).map(|u| u.value().clone()))
    }
}

/// Accounts in the `usuarios` collection
pub struct MongoUserStore {
    collection: MongoCollection<UserDoc>,
}

impl MongoUserStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let collection = client.collection::<UserDoc>(USER_COLLECTION).await?;
        Ok(Self { collection })
    }
}

impl TryFrom<UserDoc> for UserAccount {
    type Error = PolicyError;

    fn try_from(doc: UserDoc) -> Result<Self> {
        let id = doc
            ._id
            .ok_or_else(|| PolicyError::Internal("Stored user has no _id".into()))?;
        Ok(Self {
            id: id.to_hex(),
            username: doc.username,
            password_hash: doc.password_hash,
            created_at: doc
                .created_at
                .map(|d| d.to_chrono())
                .unwrap_or_else(|| id.timestamp().to_chrono()),
        })
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    fn backend(&self) -> &'static str {
        "mongo"
    }

    async fn create(&self, username: &str, password_hash: String) -> Result<UserAccount> {
        let doc = UserDoc::new(username.to_string(), password_hash.clone());
        let created_at = doc.created_at.map(|d| d.to_chrono()).unwrap_or_else(Utc::now);

        let id = match self.collection.insert_one(doc).await {
            Ok(id) => id,
            Err(e) if is_duplicate_key(&e) => return Err(duplicate_user()),
            Err(e) => return Err(e),
        };

        debug!(username, id = %id, "Account created");
        Ok(UserAccount {
            id: id.to_hex(),
            username: username.to_string(),
            password_hash,
            created_at,
        })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>> {
        self.collection
            .find_one(doc! { "username": username })
            .await?
            .map(UserAccount::try_from)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[tokio::test]
    async fn test_memory_create_and_find() {
        let store = MemoryUserStore::new();
        let created = store.create("ana", "hash".into()).await.unwrap();

        assert_eq!(created.id.len(), 24);
        let found = store.find_by_username("ana").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(store.find_by_username("luis").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_duplicate_username() {
        let store = MemoryUserStore::new();
        store.create("ana", "h1".into()).await.unwrap();

        let err = store.create("ana", "h2".into()).await.unwrap_err();
        assert!(matches!(err, PolicyError::Conflict(_)));
        assert_eq!(store.len(), 1);
        let kept = store.find_by_username("ana").await.unwrap().unwrap();
        assert_eq!(kept.password_hash, "h1");
    }

    #[test]
    fn test_user_doc_without_created_at() {
        let id = ObjectId::new();
        let account = UserAccount::try_from(UserDoc {
            _id: Some(id),
            username: "ana".into(),
            password_hash: "h".into(),
            created_at: None,
        })
        .unwrap();

        assert_eq!(account.id, id.to_hex());
        assert_eq!(account.created_at, id.timestamp().to_chrono());
    }

    #[test]
    fn test_duplicate_key_detection() {
        let err = PolicyError::StorageUnavailable(
            "Insert failed: E11000 duplicate key error collection: politicas_db.usuarios".into(),
        );
        assert!(is_duplicate_key(&err));
        assert!(!is_duplicate_key(&PolicyError::StorageUnavailable("timeout".into())));
    }
}
