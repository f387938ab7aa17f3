//! Store codecs
//!
//! A codec decides, for one entity store, which key an entity is stored
//! under, what bytes are written, and what a raw stored value decodes back
//! into.
//!
//! - [`PrimaryCodec`]: key = primary key, value = encoded entity
//! - [`UniqueIndexCodec`]: key = unique key, value = primary key bytes

use strata_core::{StrataError, StrataResult};

use crate::entity::Entity;

/// Key derivation and encoding strategy of an entity store
pub trait StoreCodec<E: Entity> {
    /// What a stored record decodes into
    type Value;

    /// Derive the storage key of `entity`
    fn key(&self, entity: &E) -> StrataResult<Vec<u8>>;

    /// Encode `entity` into the stored value
    fn encode(&self, entity: &E) -> StrataResult<Vec<u8>>;

    /// Decode a stored value; `key` is the record's storage key when known
    fn decode(&self, key: Option<&[u8]>, raw: &[u8]) -> StrataResult<Self::Value>;
}

/// Codec for the authoritative entity store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimaryCodec;

impl<E: Entity> StoreCodec<E> for PrimaryCodec {
    type Value = E;

    fn key(&self, entity: &E) -> StrataResult<Vec<u8>> {
        entity.primary_key()
    }

    fn encode(&self, entity: &E) -> StrataResult<Vec<u8>> {
        entity.encode()
    }

    fn decode(&self, key: Option<&[u8]>, raw: &[u8]) -> StrataResult<E> {
        E::decode(raw, key)
    }
}

/// Codec for a unique secondary index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniqueIndexCodec;

/// A decoded index record: unique key → primary key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexPointer {
    /// Unique key the pointer is stored under
    pub unique_key: Vec<u8>,
    /// Primary key of the record the pointer refers to
    pub primary_key: Vec<u8>,
}

impl<E: Entity> StoreCodec<E> for UniqueIndexCodec {
    type Value = IndexPointer;

    fn key(&self, entity: &E) -> StrataResult<Vec<u8>> {
        entity.unique_key()
    }

    fn encode(&self, entity: &E) -> StrataResult<Vec<u8>> {
        entity.primary_key()
    }

    /// The unique key lives only in the storage key, so it is required here
    fn decode(&self, key: Option<&[u8]>, raw: &[u8]) -> StrataResult<IndexPointer> {
        let unique_key = key.ok_or_else(|| {
            StrataError::invalid_input("index pointer cannot be decoded without its key")
        })?;
        Ok(IndexPointer {
            unique_key: unique_key.to_vec(),
            primary_key: raw.to_vec(),
        })
    }
}
