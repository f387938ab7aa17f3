//! Strata entities - transactional entity storage with a unique secondary index
//!
//! Domain types implement [`Entity`] once; an [`IndexedStore`] then keeps an
//! authoritative primary store and a unique index in lockstep, inside
//! transactions provided by the embedded [`Database`].
//!
//! # Quick Start
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use strata_entities::{Database, Entity, IndexedStore, PutMode, StrataError, StrataResult};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct User {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Entity for User {
//!     fn primary_key(&self) -> StrataResult<Vec<u8>> {
//!         if self.id.is_empty() {
//!             return Err(StrataError::invalid_input("user id is required"));
//!         }
//!         Ok(self.id.as_bytes().to_vec())
//!     }
//!
//!     fn unique_key(&self) -> StrataResult<Vec<u8>> {
//!         Ok(self.name.as_bytes().to_vec())
//!     }
//!
//!     fn encode(&self) -> StrataResult<Vec<u8>> {
//!         serde_json::to_vec(self).map_err(|e| StrataError::serialization(e.to_string()))
//!     }
//!
//!     fn decode(bytes: &[u8], _key: Option<&[u8]>) -> StrataResult<Self> {
//!         serde_json::from_slice(bytes).map_err(|e| StrataError::serialization(e.to_string()))
//!     }
//! }
//!
//! let db = Database::cache();
//! let users: IndexedStore<User> = IndexedStore::new("user", "users", "users_by_name");
//! db.update(|txn| {
//!     users.init(txn)?;
//!     users.put(txn, &User { id: "1".into(), name: "alice".into() }, PutMode::New)
//! })?;
//!
//! let alice = db.view(|txn| users.find_ent(txn, &User { name: "alice".into(), ..User::default() }))?;
//! assert_eq!(alice.id, "1");
//! # Ok::<(), StrataError>(())
//! ```
//!
//! # Architecture
//!
//! - `strata-core`: error type, addressing types and the `Tx` trait
//! - `strata-storage`: versioned in-memory storage and snapshots
//! - `strata-concurrency`: optimistic transactions with first-committer-wins
//! - `strata-engine`: the `Database` facade, configuration and logging
//! - `strata-kv`: entity stores and the indexed store

pub use strata_core::{
    display_key, BucketName, CancellationToken, ErrorCode, StrataError, StrataResult, Tx,
};
pub use strata_concurrency::TransactionContext;
pub use strata_engine::{
    init_logging, Database, LoggingConfig, StrataConfig, TransactionMetrics, CONFIG_FILE_NAME,
};
pub use strata_kv::{
    DeleteOptions, Entity, EntityStore, FindOptions, IndexPointer, IndexReport, IndexedStore,
    PutMode,
};
pub use strata_storage::UnifiedStore;
