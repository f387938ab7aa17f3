//! Entity store: typed records in one bucket
//!
//! An `EntityStore` owns a resource name (used in error messages), a bucket
//! and a codec. It holds no mutable state; every operation runs inside the
//! caller's transaction.
//!
//! ## Error Classification
//!
//! - Missing or empty key derivation → `InvalidInput`
//! - Missing record → `NotFound`
//! - Decode failures and engine failures → `Internal`, with the cause kept
//! - Cancellation and timeout pass through unchanged

use std::fmt;
use std::marker::PhantomData;

use strata_core::{display_key, BucketName, Cursor, StrataError, StrataResult, Tx};

use crate::codec::{PrimaryCodec, StoreCodec, UniqueIndexCodec};
use crate::entity::Entity;
use crate::instrument::traced;
use crate::options::{DeleteOptions, FindOptions};

/// Typed access to the records of one bucket
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use strata_core::{StrataError, StrataResult};
/// use strata_engine::Database;
/// use strata_kv::{Entity, EntityStore, FindOptions};
///
/// #[derive(Serialize, Deserialize)]
/// struct Bucket {
///     id: String,
///     owner: String,
/// }
///
/// impl Entity for Bucket {
///     fn primary_key(&self) -> StrataResult<Vec<u8>> {
///         Ok(self.id.as_bytes().to_vec())
///     }
///
///     fn encode(&self) -> StrataResult<Vec<u8>> {
///         serde_json::to_vec(self).map_err(|e| StrataError::serialization(e.to_string()))
///     }
///
///     fn decode(bytes: &[u8], _key: Option<&[u8]>) -> StrataResult<Self> {
///         serde_json::from_slice(bytes).map_err(|e| StrataError::serialization(e.to_string()))
///     }
/// }
///
/// let db = Database::cache();
/// let store: EntityStore<Bucket> = EntityStore::new("bucket", "buckets");
/// db.update(|txn| {
///     store.init(txn)?;
///     store.put(txn, &Bucket { id: "b1".into(), owner: "o1".into() })
/// })
/// .unwrap();
///
/// let owners: Vec<String> = db
///     .view(|txn| {
///         store
///             .find(txn, FindOptions::new())?
///             .map(|r| r.map(|(_, b)| b.owner))
///             .collect()
///     })
///     .unwrap();
/// assert_eq!(owners, vec!["o1".to_string()]);
/// ```
pub struct EntityStore<E, C = PrimaryCodec> {
    resource: String,
    bucket: BucketName,
    codec: C,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityStore<E, PrimaryCodec> {
    /// Store of `E` records keyed by primary key
    pub fn new(resource: impl Into<String>, bucket: impl Into<BucketName>) -> Self {
        Self::with_codec(resource, bucket, PrimaryCodec)
    }
}

impl<E: Entity> EntityStore<E, UniqueIndexCodec> {
    /// Store of index pointers keyed by the unique key of `E`
    pub fn new_index(resource: impl Into<String>, bucket: impl Into<BucketName>) -> Self {
        Self::with_codec(resource, bucket, UniqueIndexCodec)
    }
}

impl<E: Entity, C: StoreCodec<E>> EntityStore<E, C> {
    /// Store using a custom codec
    pub fn with_codec(resource: impl Into<String>, bucket: impl Into<BucketName>, codec: C) -> Self {
        Self {
            resource: resource.into(),
            bucket: bucket.into(),
            codec,
            _entity: PhantomData,
        }
    }

    /// Resource name used in error messages
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Backing bucket
    pub fn bucket(&self) -> &BucketName {
        &self.bucket
    }

    /// Create the backing bucket if it does not exist yet
    pub fn init(&self, tx: &mut dyn Tx) -> StrataResult<()> {
        traced("init", &self.resource, || {
            tx.create_bucket_if_not_exists(&self.bucket)
                .map_err(|e| self.engine_error("create bucket for", None, e))
        })
    }

    /// Derive the storage key of `entity`
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the entity lacks identifying fields or derives an
    /// empty key.
    pub fn ent_key(&self, entity: &E) -> StrataResult<Vec<u8>> {
        match self.codec.key(entity) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(self.no_key()),
        }
    }

    /// Look up the record `entity` identifies
    pub fn find_ent(&self, tx: &mut dyn Tx, entity: &E) -> StrataResult<C::Value> {
        traced("find_ent", &self.resource, || {
            let key = self.ent_key(entity)?;
            self.get(tx, &key)
        })
    }

    /// Look up the record stored under `key`
    pub fn find_key(&self, tx: &mut dyn Tx, key: &[u8]) -> StrataResult<C::Value> {
        traced("find_key", &self.resource, || self.get(tx, key))
    }

    /// Scan the bucket
    ///
    /// The returned iterator is lazy in decoding; the scan itself reads the
    /// transaction's view once, up front. Every key in the range joins the
    /// read set, so a concurrent write anywhere in the range aborts the
    /// commit, even past `limit`.
    pub fn find<'a>(
        &self,
        tx: &mut dyn Tx,
        options: FindOptions<'a, C::Value>,
    ) -> StrataResult<Find<'_, 'a, E, C>> {
        traced("find", &self.resource, || {
            let cursor = tx
                .scan(&self.bucket, &options.scan_range())
                .map_err(|e| self.engine_error("scan", None, e))?;
            Ok(Find {
                store: self,
                cursor,
                options,
                skipped: 0,
                yielded: 0,
                done: false,
            })
        })
    }

    /// Write `entity` under its derived key, overwriting any existing record
    pub fn put(&self, tx: &mut dyn Tx, entity: &E) -> StrataResult<()> {
        traced("put", &self.resource, || {
            let key = self.ent_key(entity)?;
            let value = self.codec.encode(entity)?;
            tx.put(&self.bucket, &key, value)
                .map_err(|e| self.engine_error("put", Some(key.as_slice()), e))
        })
    }

    /// Delete every record matching `options`
    ///
    /// All matches are collected before anything is written. For each match
    /// the relation callbacks run in order, then the record is removed.
    ///
    /// # Returns
    ///
    /// The number of records removed.
    ///
    /// # Errors
    ///
    /// The first callback or engine failure aborts the delete.
    pub fn delete<'a>(
        &self,
        tx: &mut dyn Tx,
        mut options: DeleteOptions<'a, C::Value>,
    ) -> StrataResult<usize> {
        traced("delete", &self.resource, || {
            let cursor = tx
                .scan(&self.bucket, &options.scan_range())
                .map_err(|e| self.engine_error("scan", None, e))?;

            let mut matched = Vec::new();
            for (key, raw) in cursor {
                let value = self.to_entity(Some(key.as_slice()), &raw)?;
                if options.accepts(&key, &value) {
                    matched.push((key, value));
                }
            }

            for (key, value) in &matched {
                let key = key.as_slice();
                for relation in options.relations.iter_mut() {
                    relation(&mut *tx, key, value)?;
                }
                tx.delete(&self.bucket, key)
                    .map_err(|e| self.engine_error("delete", Some(key), e))?;
            }
            Ok(matched.len())
        })
    }

    /// Delete the single record `entity` identifies
    ///
    /// # Errors
    ///
    /// `NotFound` if no such record exists.
    pub fn delete_ent(&self, tx: &mut dyn Tx, entity: &E) -> StrataResult<()> {
        traced("delete_ent", &self.resource, || {
            let key = self.ent_key(entity)?;
            self.remove(tx, &key)
        })
    }

    /// Delete the single record stored under `key`
    pub fn delete_key(&self, tx: &mut dyn Tx, key: &[u8]) -> StrataResult<()> {
        traced("delete_key", &self.resource, || self.remove(tx, key))
    }

    /// Decode a raw stored value, with its storage key when known
    pub fn to_entity(&self, key: Option<&[u8]>, raw: &[u8]) -> StrataResult<C::Value> {
        self.codec.decode(key, raw).map_err(|e| {
            let shown = key.map(display_key).unwrap_or_default();
            StrataError::wrap_internal(
                format!("failed to decode {} for key {}", self.resource, shown),
                e,
            )
        })
    }

    fn get(&self, tx: &mut dyn Tx, key: &[u8]) -> StrataResult<C::Value> {
        if key.is_empty() {
            return Err(self.no_key());
        }
        let raw = tx
            .get(&self.bucket, key)
            .map_err(|e| self.engine_error("get", Some(key), e))?
            .ok_or_else(|| self.not_found(key))?;
        self.to_entity(Some(key), &raw)
    }

    fn remove(&self, tx: &mut dyn Tx, key: &[u8]) -> StrataResult<()> {
        if key.is_empty() {
            return Err(self.no_key());
        }
        let exists = tx
            .exists(&self.bucket, key)
            .map_err(|e| self.engine_error("get", Some(key), e))?;
        if !exists {
            return Err(self.not_found(key));
        }
        tx.delete(&self.bucket, key)
            .map_err(|e| self.engine_error("delete", Some(key), e))
    }

    fn no_key(&self) -> StrataError {
        StrataError::invalid_input(format!("no key was provided for {}", self.resource))
    }

    fn not_found(&self, key: &[u8]) -> StrataError {
        StrataError::not_found(format!("{} not found for key {}", self.resource, display_key(key)))
    }

    fn engine_error(&self, action: &str, key: Option<&[u8]>, e: StrataError) -> StrataError {
        if e.is_cancelled() {
            return e;
        }
        let message = match key {
            Some(key) => format!("failed to {} {} for key {}", action, self.resource, display_key(key)),
            None => format!("failed to {} {}", action, self.resource),
        };
        StrataError::wrap_internal(message, e)
    }
}

impl<E, C: fmt::Debug> fmt::Debug for EntityStore<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("resource", &self.resource)
            .field("bucket", &self.bucket)
            .field("codec", &self.codec)
            .finish()
    }
}

/// Iterator returned by [`EntityStore::find`]
///
/// Yields `(key, value)` pairs in scan order. Finite and not restartable; a
/// decode error is yielded once and ends the iteration.
pub struct Find<'s, 'a, E, C: StoreCodec<E>>
where
    E: Entity,
{
    store: &'s EntityStore<E, C>,
    cursor: Cursor,
    options: FindOptions<'a, C::Value>,
    skipped: usize,
    yielded: usize,
    done: bool,
}

impl<E: Entity, C: StoreCodec<E>> Iterator for Find<'_, '_, E, C> {
    type Item = StrataResult<(Vec<u8>, C::Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if self.options.limit.is_some_and(|limit| self.yielded >= limit) {
                break;
            }
            let Some((key, raw)) = self.cursor.next() else {
                break;
            };
            let value = match self.store.to_entity(Some(key.as_slice()), &raw) {
                Ok(value) => value,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            if !self.options.accepts(&key, &value) {
                continue;
            }
            if self.options.should_stop(&key, &value) {
                break;
            }
            if self.skipped < self.options.offset {
                self.skipped += 1;
                continue;
            }
            self.yielded += 1;
            return Some(Ok((key, value)));
        }
        self.done = true;
        None
    }
}

impl<E: Entity, C: StoreCodec<E>> fmt::Debug for Find<'_, '_, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Find")
            .field("resource", &self.store.resource)
            .field("remaining", &self.cursor.remaining())
            .field("yielded", &self.yielded)
            .field("done", &self.done)
            .finish()
    }
}
