//! UnifiedStore: in-memory bucketed storage with version management
//!
//! This module implements the Storage trait using:
//! - `BTreeMap<BucketKey, VersionedValue>` for ordered key storage
//! - `BTreeMap<BucketName, u64>` recording the version each bucket was created at
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` for monotonically increasing version numbers
//!
//! # Design Notes
//!
//! - **No version history**: Each key stores only its latest value
//! - **Single lock**: buckets and records live behind one lock, so a snapshot
//!   never sees a bucket without the records committed alongside it
//! - **Deletes drop the record**: a deleted key reads as version 0 again

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use strata_core::{
    BucketKey, BucketName, StrataError, StrataResult, Storage, VersionedValue, WriteBatch,
};

use crate::snapshot::ClonedSnapshotView;

/// Committed state guarded by the store lock
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreData {
    /// Bucket name → version the bucket was created at
    pub(crate) buckets: BTreeMap<BucketName, u64>,
    /// Record key → latest committed value
    pub(crate) records: BTreeMap<BucketKey, VersionedValue>,
}

impl StoreData {
    /// Ascending records of one bucket, optionally restricted to a prefix
    pub(crate) fn scan_bucket<'a>(
        &'a self,
        bucket: &'a BucketName,
        prefix: Option<&'a [u8]>,
    ) -> impl Iterator<Item = (&'a BucketKey, &'a VersionedValue)> + 'a {
        let start = BucketKey::new(bucket.clone(), prefix.unwrap_or_default());
        self.records
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(move |(k, _)| {
                &k.bucket == bucket && prefix.map_or(true, |p| k.key.starts_with(p))
            })
    }
}

/// Unified storage backend using BTreeMap with RwLock
///
/// Thread-safe through `parking_lot::RwLock` and `AtomicU64`.
#[derive(Debug)]
pub struct UnifiedStore {
    /// Buckets and records
    data: Arc<RwLock<StoreData>>,
    /// Global version counter for monotonically increasing versions
    version: AtomicU64,
}

impl UnifiedStore {
    /// Create a new empty UnifiedStore
    ///
    /// Initial version is 0 (no writes have occurred).
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(StoreData::default())),
            version: AtomicU64::new(0),
        }
    }

    /// Create a snapshot of the current state
    ///
    /// Deep-clones the committed state. O(n) in the number of records.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_core::{BucketKey, BucketName, SnapshotView, Storage, WriteBatch};
    /// use strata_storage::UnifiedStore;
    ///
    /// let store = UnifiedStore::new();
    /// let snapshot = store.create_snapshot();
    ///
    /// let mut batch = WriteBatch::default();
    /// batch.buckets.insert(BucketName::new("users"));
    /// batch.puts.insert(BucketKey::new(BucketName::new("users"), b"1"), b"alice".to_vec());
    /// store.apply_batch(&batch, 1).unwrap();
    ///
    /// // Writes after snapshot creation are not visible in snapshot
    /// assert!(!snapshot.bucket_exists(&BucketName::new("users")));
    /// ```
    pub fn create_snapshot(&self) -> ClonedSnapshotView {
        // Read the version under the lock so it matches the cloned data.
        let data = self.data.read();
        let version = self.current_version();
        ClonedSnapshotView::new(version, data.clone())
    }

    /// Read the committed value at `key`
    pub fn get(&self, key: &BucketKey) -> Option<VersionedValue> {
        self.data.read().records.get(key).cloned()
    }

    /// Names of all created buckets, in order
    pub fn bucket_names(&self) -> Vec<BucketName> {
        self.data.read().buckets.keys().cloned().collect()
    }

    /// Number of records stored in `bucket`
    pub fn bucket_len(&self, bucket: &BucketName) -> usize {
        self.data.read().scan_bucket(bucket, None).count()
    }

    /// Total number of records across all buckets
    pub fn len(&self) -> usize {
        self.data.read().records.len()
    }

    /// Check if no records are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UnifiedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for UnifiedStore {
    fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn get_version(&self, key: &BucketKey) -> StrataResult<u64> {
        Ok(self
            .data
            .read()
            .records
            .get(key)
            .map(|v| v.version)
            .unwrap_or(0))
    }

    fn bucket_exists(&self, bucket: &BucketName) -> bool {
        self.data.read().buckets.contains_key(bucket)
    }

    /// Apply a batch of writes and deletes atomically
    ///
    /// Holds the write lock during ALL operations, so no snapshot can see a
    /// partial transaction. The batch is checked before anything is applied.
    fn apply_batch(&self, batch: &WriteBatch, version: u64) -> StrataResult<()> {
        let mut data = self.data.write();

        let missing = batch
            .puts
            .keys()
            .chain(batch.deletes.iter())
            .map(|k| &k.bucket)
            .find(|b| !data.buckets.contains_key(*b) && !batch.buckets.contains(*b));
        if let Some(bucket) = missing {
            return Err(StrataError::BucketNotFound {
                bucket: bucket.to_string(),
            });
        }

        for bucket in &batch.buckets {
            data.buckets.entry(bucket.clone()).or_insert(version);
        }
        for (key, value) in &batch.puts {
            data.records
                .insert(key.clone(), VersionedValue::new(value.clone(), version));
        }
        for key in &batch.deletes {
            data.records.remove(key);
        }

        // Update global version to be at least this version
        self.version.fetch_max(version, Ordering::SeqCst);

        trace!(
            target: "strata::storage",
            version,
            puts = batch.puts.len(),
            deletes = batch.deletes.len(),
            "applied batch"
        );
        Ok(())
    }
}
