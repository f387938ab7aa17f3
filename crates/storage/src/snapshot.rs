//! ClonedSnapshotView: snapshot implementation via deep clone
//!
//! This module provides version-bounded views of storage for transaction isolation.
//! The snapshot is a deep clone of the committed buckets and records.
//!
//! # Design Notes
//!
//! - **Deep clone**: Expensive but simple (full BTreeMap copy)
//! - **Immutable**: Once created, the snapshot never changes
//! - **Thread-safe**: Can be safely shared across threads (Arc-wrapped data)

use std::sync::Arc;

use strata_core::{BucketKey, BucketName, SnapshotView, StrataError, StrataResult, VersionedValue};

use crate::unified::StoreData;

/// A snapshot view that clones the entire store
#[derive(Debug, Clone)]
pub struct ClonedSnapshotView {
    /// The version at which this snapshot was created
    version: u64,
    /// Deep clone of the storage data at snapshot time
    data: Arc<StoreData>,
}

impl ClonedSnapshotView {
    /// Create a new ClonedSnapshotView from cloned store data
    ///
    /// This is called by `UnifiedStore::create_snapshot()`, not directly.
    pub(crate) fn new(version: u64, data: StoreData) -> Self {
        Self {
            version,
            data: Arc::new(data),
        }
    }

    /// Create an empty snapshot at version 0
    pub fn empty() -> Self {
        Self::new(0, StoreData::default())
    }

    /// Number of records visible in this snapshot
    pub fn len(&self) -> usize {
        self.data.records.len()
    }

    /// Check if the snapshot holds no records
    pub fn is_empty(&self) -> bool {
        self.data.records.is_empty()
    }
}

impl SnapshotView for ClonedSnapshotView {
    fn get(&self, key: &BucketKey) -> StrataResult<Option<VersionedValue>> {
        Ok(self.data.records.get(key).cloned())
    }

    fn scan(
        &self,
        bucket: &BucketName,
        prefix: Option<&[u8]>,
    ) -> StrataResult<Vec<(Vec<u8>, VersionedValue)>> {
        if !self.bucket_exists(bucket) {
            return Err(StrataError::BucketNotFound {
                bucket: bucket.to_string(),
            });
        }
        Ok(self
            .data
            .scan_bucket(bucket, prefix)
            .map(|(k, v)| (k.key.clone(), v.clone()))
            .collect())
    }

    fn bucket_exists(&self, bucket: &BucketName) -> bool {
        self.data.buckets.contains_key(bucket)
    }

    fn version(&self) -> u64 {
        self.version
    }
}
