//! Entity storage for Strata
//!
//! This crate maps typed entities onto engine buckets:
//! - Entity: key derivation and encoding implemented once per domain type
//! - EntityStore: typed CRUD and scans over one bucket
//! - IndexedStore: an entity store kept in lockstep with a unique index
//!
//! Every operation runs inside a caller-supplied transaction (`&mut dyn Tx`);
//! atomicity across records is the transaction's job.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod entity;
pub mod entity_store;
pub mod indexed_store;
pub mod options;

mod instrument;
#[cfg(test)]
mod test_support;

pub use codec::{IndexPointer, PrimaryCodec, StoreCodec, UniqueIndexCodec};
pub use entity::Entity;
pub use entity_store::{EntityStore, Find};
pub use indexed_store::{IndexReport, IndexedStore};
pub use options::{DeleteOptions, DeleteRelationFn, FindOptions, PutMode};
