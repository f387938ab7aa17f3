//! Shared entities and fixtures for the entity store suite

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use strata_entities::{
    BucketName, Database, DeleteOptions, Entity, EntityStore, FindOptions, IndexedStore,
    StrataError, StrataResult,
};

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
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

/// A user's membership in an org, keyed `<user id>/<org>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: String,
    pub org: String,
}

impl Membership {
    pub fn new(user_id: &str, org: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            org: org.to_string(),
        }
    }

    pub fn prefix(user_id: &str) -> Vec<u8> {
        format!("{}/", user_id).into_bytes()
    }
}

impl Entity for Membership {
    fn primary_key(&self) -> StrataResult<Vec<u8>> {
        if self.user_id.is_empty() || self.org.is_empty() {
            return Err(StrataError::invalid_input("membership needs a user and an org"));
        }
        Ok(format!("{}/{}", self.user_id, self.org).into_bytes())
    }

    fn encode(&self) -> StrataResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StrataError::serialization(e.to_string()))
    }

    fn decode(bytes: &[u8], _key: Option<&[u8]>) -> StrataResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StrataError::serialization(e.to_string()))
    }
}

// ============================================================================
// Fixture
// ============================================================================

pub const USERS: &str = "users";
pub const USERS_BY_NAME: &str = "users_by_name";

pub struct Fixture {
    pub db: Database,
    pub users: IndexedStore<User>,
    pub memberships: EntityStore<Membership>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_db(Database::cache())
    }

    pub fn with_db(db: Database) -> Self {
        let fixture = Self {
            db,
            users: IndexedStore::new("user", USERS, USERS_BY_NAME),
            memberships: EntityStore::new("membership", "memberships"),
        };
        fixture
            .db
            .update(|txn| {
                fixture.users.init(txn)?;
                fixture.memberships.init(txn)
            })
            .unwrap();
        fixture
    }

    pub fn create(&self, id: &str, name: &str) -> StrataResult<()> {
        self.db
            .update(|txn| self.users.put(txn, &User::new(id, name), strata_entities::PutMode::New))
    }

    pub fn find(&self, query: &User) -> StrataResult<User> {
        self.db.view(|txn| self.users.find_ent(txn, query))
    }

    /// Unique keys currently present in the index, read straight from the
    /// index store
    pub fn pointer_keys(&self) -> Vec<String> {
        self.db
            .view(|txn| {
                self.users
                    .index_store()
                    .find(txn, FindOptions::new())?
                    .map(|r| r.map(|(k, _)| String::from_utf8_lossy(&k).into_owned()))
                    .collect()
            })
            .unwrap()
    }

    pub fn user_ids(&self) -> Vec<String> {
        self.db
            .view(|txn| {
                self.users
                    .find(txn, FindOptions::new())?
                    .map(|r| r.map(|(_, u)| u.id))
                    .collect()
            })
            .unwrap()
    }

    pub fn membership_count(&self) -> usize {
        self.db
            .view(|txn| Ok(self.memberships.find(txn, FindOptions::new())?.count()))
            .unwrap()
    }

    /// Delete options that also remove each user's memberships
    pub fn with_membership_cascade<'a>(&'a self, options: DeleteOptions<'a, User>) -> DeleteOptions<'a, User> {
        options.relation(move |tx, _, user: &User| {
            self.memberships
                .delete(tx, DeleteOptions::new().prefix(Membership::prefix(&user.id)))
                .map(|_| ())
        })
    }

    pub fn bucket(name: &str) -> BucketName {
        BucketName::new(name)
    }
}
