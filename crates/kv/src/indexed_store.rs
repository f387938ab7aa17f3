//! Indexed store: an entity store kept in lockstep with a unique index
//!
//! The primary store is authoritative. The index maps each record's unique
//! key to its primary key and is a derived view that can be rebuilt at any
//! time.
//!
//! ## Write ordering
//!
//! `put` writes the index pointer before the primary record. If the
//! transaction is torn between the two writes, what remains is a pointer
//! with no live target, which every read path treats as absent and which
//! `prune_stale_pointers` or `rebuild_index` removes. The reverse order
//! could leave a primary record that no unique-key lookup can reach.
//!
//! ## Stale pointers
//!
//! A pointer is stale when its target primary record is missing or no longer
//! carries the pointer's unique key. Stale pointers never block a new
//! record from claiming that unique key.

use std::collections::HashMap;
use std::fmt;

use strata_core::{display_key, BucketName, StrataError, StrataResult, Tx};
use tracing::{debug, info};

use crate::codec::{IndexPointer, PrimaryCodec, UniqueIndexCodec};
use crate::entity::Entity;
use crate::entity_store::{EntityStore, Find};
use crate::instrument::traced;
use crate::options::{DeleteOptions, FindOptions, PutMode};

/// Entity store with a unique secondary index
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use strata_core::{StrataError, StrataResult};
/// use strata_engine::Database;
/// use strata_kv::{Entity, IndexedStore, PutMode};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Org {
///     id: String,
///     name: String,
/// }
///
/// impl Entity for Org {
///     fn primary_key(&self) -> StrataResult<Vec<u8>> {
///         if self.id.is_empty() {
///             return Err(StrataError::invalid_input("org id is required"));
///         }
///         Ok(self.id.as_bytes().to_vec())
///     }
///
///     fn unique_key(&self) -> StrataResult<Vec<u8>> {
///         Ok(self.name.as_bytes().to_vec())
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
/// let orgs: IndexedStore<Org> = IndexedStore::new("org", "orgs", "orgs_by_name");
/// db.update(|txn| {
///     orgs.init(txn)?;
///     orgs.put(txn, &Org { id: "1".into(), name: "acme".into() }, PutMode::New)
/// })
/// .unwrap();
///
/// let by_name = Org { name: "acme".into(), ..Org::default() };
/// let found = db.view(|txn| orgs.find_ent(txn, &by_name)).unwrap();
/// assert_eq!(found.id, "1");
/// ```
pub struct IndexedStore<E> {
    resource: String,
    entity_store: EntityStore<E, PrimaryCodec>,
    index_store: EntityStore<E, UniqueIndexCodec>,
}

/// Result of [`IndexedStore::verify_index`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Number of primary records
    pub records: usize,
    /// Number of index pointers
    pub pointers: usize,
    /// Unique keys of pointers with no live target
    pub stale_pointers: Vec<Vec<u8>>,
    /// Primary keys of records no pointer resolves to
    pub unindexed_records: Vec<Vec<u8>>,
}

impl IndexReport {
    /// True when every record is indexed and no pointer is stale
    pub fn is_consistent(&self) -> bool {
        self.stale_pointers.is_empty() && self.unindexed_records.is_empty()
    }
}

impl<E: Entity> IndexedStore<E> {
    /// Store `E` records in `entity_bucket`, indexed by unique key in
    /// `index_bucket`
    pub fn new(
        resource: impl Into<String>,
        entity_bucket: impl Into<BucketName>,
        index_bucket: impl Into<BucketName>,
    ) -> Self {
        let resource = resource.into();
        let entity_store = EntityStore::new(resource.clone(), entity_bucket);
        let index_store = EntityStore::new_index(format!("{} index", resource), index_bucket);
        Self::from_stores(resource, entity_store, index_store)
    }

    /// Combine existing stores
    pub fn from_stores(
        resource: impl Into<String>,
        entity_store: EntityStore<E, PrimaryCodec>,
        index_store: EntityStore<E, UniqueIndexCodec>,
    ) -> Self {
        Self {
            resource: resource.into(),
            entity_store,
            index_store,
        }
    }

    /// Resource name used in error messages
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The authoritative primary store
    pub fn entity_store(&self) -> &EntityStore<E, PrimaryCodec> {
        &self.entity_store
    }

    /// The unique index, for direct scans over pointers
    pub fn index_store(&self) -> &EntityStore<E, UniqueIndexCodec> {
        &self.index_store
    }

    /// Create both buckets if absent
    pub fn init(&self, tx: &mut dyn Tx) -> StrataResult<()> {
        traced("init", &self.resource, || {
            self.entity_store.init(tx)?;
            self.index_store.init(tx)
        })
    }

    /// Scan primary records
    pub fn find<'a>(
        &self,
        tx: &mut dyn Tx,
        options: FindOptions<'a, E>,
    ) -> StrataResult<Find<'_, 'a, E, PrimaryCodec>> {
        self.entity_store.find(tx, options)
    }

    /// Look up a record by primary key, or by unique key when the entity has
    /// no primary key
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if neither key can be derived
    /// - `NotFound` if the record is missing or the index pointer is stale
    pub fn find_ent(&self, tx: &mut dyn Tx, entity: &E) -> StrataResult<E> {
        traced("find_ent", &self.resource, || {
            if let Ok(pk) = self.entity_store.ent_key(entity) {
                return self.entity_store.find_key(tx, &pk);
            }
            let uk = self.unique_key(entity)?;
            self.find_by_unique_key(tx, &uk)
        })
    }

    /// Write `entity` after the validation `mode` selects
    ///
    /// The index pointer is written before the primary record.
    ///
    /// # Errors
    ///
    /// - `Conflict` if another live record holds the unique key
    /// - `NotFound` on `PutMode::Update` when the primary key does not exist,
    ///   or when the unique key points at a record that no longer exists
    /// - `InvalidInput` if a required key cannot be derived
    pub fn put(&self, tx: &mut dyn Tx, entity: &E, mode: PutMode) -> StrataResult<()> {
        traced("put", &self.resource, || {
            let replaced = match mode {
                PutMode::New => {
                    self.validate_new(tx, entity)?;
                    None
                }
                PutMode::Update => self.validate_update(tx, entity)?,
                PutMode::Unchecked => None,
            };

            if let Some(old_key) = replaced {
                debug!(
                    target: "strata::kv",
                    resource = %self.resource,
                    old_key = %display_key(&old_key),
                    "dropping pointer for renamed record"
                );
                self.index_store.delete_key(tx, &old_key)?;
            }
            self.index_store.put(tx, entity)?;
            self.entity_store.put(tx, entity)
        })
    }

    /// Delete matching primary records and their index pointers
    ///
    /// Caller relations run first; pointer removal is appended last.
    pub fn delete<'a>(&'a self, tx: &mut dyn Tx, options: DeleteOptions<'a, E>) -> StrataResult<usize> {
        let options = options.relation(move |tx, pk, record| self.drop_pointer(tx, pk, record));
        traced("delete", &self.resource, || self.entity_store.delete(tx, options))
    }

    /// Delete one record, found by either key, and its index pointer
    pub fn delete_ent(&self, tx: &mut dyn Tx, entity: &E) -> StrataResult<()> {
        traced("delete_ent", &self.resource, || {
            let stored = self.find_ent(tx, entity)?;
            let pk = self.entity_store.ent_key(&stored)?;
            self.entity_store.delete_key(tx, &pk)?;
            self.drop_pointer(tx, &pk, &stored)
        })
    }

    // ========================================================================
    // Index maintenance
    // ========================================================================

    /// Drop every pointer and re-derive the index from the primary records
    ///
    /// # Returns
    ///
    /// The number of pointers written.
    ///
    /// # Errors
    ///
    /// `Conflict` if two primary records share a unique key.
    pub fn rebuild_index(&self, tx: &mut dyn Tx) -> StrataResult<usize> {
        traced("rebuild_index", &self.resource, || {
            for (key, _) in self.pointers(tx)? {
                self.index_store.delete_key(tx, &key)?;
            }

            let records: Vec<(Vec<u8>, E)> = self
                .entity_store
                .find(tx, FindOptions::new())?
                .collect::<StrataResult<_>>()?;

            let mut owners: HashMap<Vec<u8>, Vec<u8>> = HashMap::with_capacity(records.len());
            for (pk, record) in &records {
                let uk = self.unique_key(record)?;
                if let Some(owner) = owners.insert(uk.clone(), pk.clone()) {
                    return Err(StrataError::conflict(format!(
                        "{} is not unique for key {}: held by {} and {}",
                        self.resource,
                        display_key(&uk),
                        display_key(&owner),
                        display_key(pk)
                    )));
                }
                self.index_store.put(tx, record)?;
            }

            info!(
                target: "strata::kv",
                resource = %self.resource,
                pointers = owners.len(),
                "index rebuilt"
            );
            Ok(owners.len())
        })
    }

    /// Delete pointers whose target is missing or carries another unique key
    ///
    /// # Returns
    ///
    /// The number of pointers removed.
    pub fn prune_stale_pointers(&self, tx: &mut dyn Tx) -> StrataResult<usize> {
        traced("prune_stale_pointers", &self.resource, || {
            let mut pruned = 0;
            for (key, pointer) in self.pointers(tx)? {
                if self.is_stale(tx, &pointer)? {
                    self.index_store.delete_key(tx, &key)?;
                    pruned += 1;
                }
            }
            if pruned > 0 {
                info!(target: "strata::kv", resource = %self.resource, pruned, "stale pointers pruned");
            }
            Ok(pruned)
        })
    }

    /// Check the index against the primary records without writing
    pub fn verify_index(&self, tx: &mut dyn Tx) -> StrataResult<IndexReport> {
        traced("verify_index", &self.resource, || {
            let pointers = self.pointers(tx)?;
            let mut report = IndexReport {
                pointers: pointers.len(),
                ..IndexReport::default()
            };
            for (key, pointer) in &pointers {
                if self.is_stale(tx, pointer)? {
                    report.stale_pointers.push(key.clone());
                }
            }

            let live: HashMap<&[u8], &[u8]> = pointers
                .iter()
                .map(|(key, pointer)| (key.as_slice(), pointer.primary_key.as_slice()))
                .collect();
            for record in self.entity_store.find(tx, FindOptions::new())? {
                let (pk, record) = record?;
                report.records += 1;
                let indexed = record
                    .unique_key()
                    .ok()
                    .and_then(|uk| live.get(uk.as_slice()).map(|target| *target == pk.as_slice()))
                    .unwrap_or(false);
                if !indexed {
                    report.unindexed_records.push(pk);
                }
            }
            Ok(report)
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn unique_key(&self, entity: &E) -> StrataResult<Vec<u8>> {
        self.index_store.ent_key(entity).map_err(|_| {
            StrataError::invalid_input(format!("no key was provided for {}", self.resource))
        })
    }

    /// Follow the pointer for `uk` to a live primary record
    fn find_by_unique_key(&self, tx: &mut dyn Tx, uk: &[u8]) -> StrataResult<E> {
        let pointer = self.index_store.find_key(tx, uk)?;
        let record = self
            .entity_store
            .find_key(tx, &pointer.primary_key)
            .map_err(|e| {
                if e.is_not_found() {
                    StrataError::wrap_not_found(self.not_found_message(uk), e)
                } else {
                    e
                }
            })?;
        match record.unique_key() {
            Ok(current) if current == uk => Ok(record),
            _ => Err(StrataError::not_found(self.not_found_message(uk))),
        }
    }

    fn validate_new(&self, tx: &mut dyn Tx, entity: &E) -> StrataResult<()> {
        let uk = self.unique_key(entity)?;
        let pk = self.entity_store.ent_key(entity)?;

        match self.find_by_unique_key(tx, &uk) {
            Ok(_) => return Err(StrataError::conflict(self.not_unique_message(&uk))),
            Err(e) if e.is_not_found() => {}
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => return Err(StrataError::wrap_conflict(self.not_unique_message(&uk), e)),
        }

        match self.entity_store.find_key(tx, &pk) {
            // An existing primary record does not fail a create
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => Err(StrataError::wrap_internal(
                format!("failed to check {} for key {}", self.resource, display_key(&pk)),
                e,
            )),
        }
    }

    /// Returns the unique key whose pointer must be dropped for a rename
    fn validate_update(&self, tx: &mut dyn Tx, entity: &E) -> StrataResult<Option<Vec<u8>>> {
        let pk = self.entity_store.ent_key(entity)?;
        let stored = self.entity_store.find_key(tx, &pk).map_err(|e| {
            if e.is_not_found() {
                StrataError::wrap_not_found(self.missing_message(&pk), e)
            } else {
                e
            }
        })?;
        let uk = self.unique_key(entity)?;

        match self.index_store.find_key(tx, &uk) {
            Ok(pointer) if pointer.primary_key != pk => {
                match self.entity_store.find_key(tx, &pointer.primary_key) {
                    Ok(holder) if holder.unique_key().is_ok_and(|held| held == uk) => {
                        return Err(StrataError::conflict(format!(
                            "{} entity update conflicts with an existing entity for key {}",
                            self.resource,
                            display_key(&uk)
                        )));
                    }
                    // The holder has moved on to another unique key
                    Ok(_) => {}
                    Err(e) if e.is_not_found() => {
                        return Err(StrataError::wrap_not_found(
                            self.missing_message(&pointer.primary_key),
                            e,
                        ));
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let old_uk = match stored.unique_key() {
            Ok(old) if !old.is_empty() && old != uk => old,
            _ => return Ok(None),
        };
        match self.index_store.find_key(tx, &old_uk) {
            Ok(pointer) if pointer.primary_key == pk => Ok(Some(old_uk)),
            Ok(_) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove the pointer for `record` if it still points at `pk`
    fn drop_pointer(&self, tx: &mut dyn Tx, pk: &[u8], record: &E) -> StrataResult<()> {
        let uk = self.unique_key(record)?;
        match self.index_store.find_key(tx, &uk) {
            Ok(pointer) if pointer.primary_key == pk => self.index_store.delete_key(tx, &uk),
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn pointers(&self, tx: &mut dyn Tx) -> StrataResult<Vec<(Vec<u8>, IndexPointer)>> {
        self.index_store.find(tx, FindOptions::new())?.collect()
    }

    fn is_stale(&self, tx: &mut dyn Tx, pointer: &IndexPointer) -> StrataResult<bool> {
        match self.entity_store.find_key(tx, &pointer.primary_key) {
            Ok(record) => Ok(record
                .unique_key()
                .map_or(true, |uk| uk != pointer.unique_key)),
            Err(e) if e.is_not_found() => Ok(true),
            Err(e) => Err(e),
        }
    }

    fn not_found_message(&self, uk: &[u8]) -> String {
        format!("{} not found for key {}", self.resource, display_key(uk))
    }

    fn not_unique_message(&self, uk: &[u8]) -> String {
        format!("{} is not unique for key {}", self.resource, display_key(uk))
    }

    fn missing_message(&self, pk: &[u8]) -> String {
        format!("{} does not exist for key {}", self.resource, display_key(pk))
    }
}

impl<E> fmt::Debug for IndexedStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedStore")
            .field("resource", &self.resource)
            .field("entity_store", &self.entity_store)
            .field("index_store", &self.index_store)
            .finish()
    }
}
