//! Shared fixtures for unit tests

use serde::{Deserialize, Serialize};
use strata_core::{BucketName, StrataError, StrataResult};
use strata_engine::Database;

use crate::{Entity, EntityStore, IndexedStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name),
        }
    }

    pub fn by_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn by_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Entity for User {
    fn primary_key(&self) -> StrataResult<Vec<u8>> {
        if self.id.is_empty() {
            return Err(StrataError::invalid_input("user id is required"));
        }
        Ok(self.id.as_bytes().to_vec())
    }

    fn unique_key(&self) -> StrataResult<Vec<u8>> {
        if self.name.is_empty() {
            return Err(StrataError::invalid_input("user name is required"));
        }
        Ok(self.name.as_bytes().to_vec())
    }

    fn encode(&self) -> StrataResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StrataError::serialization(e.to_string()))
    }

    fn decode(bytes: &[u8], _key: Option<&[u8]>) -> StrataResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StrataError::serialization(e.to_string()))
    }
}

pub(crate) fn user_store() -> EntityStore<User> {
    EntityStore::new("user", BucketName::new("users"))
}

pub(crate) fn indexed_users() -> IndexedStore<User> {
    IndexedStore::new(
        "user",
        BucketName::new("users"),
        BucketName::new("users_by_name"),
    )
}

/// Database with both user buckets created
pub(crate) fn open() -> Database {
    let db = Database::cache();
    let store = indexed_users();
    db.update(|txn| store.init(txn)).unwrap();
    db
}
