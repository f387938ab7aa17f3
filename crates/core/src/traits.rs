//! Core traits for storage, snapshot and transaction abstraction
//!
//! This module defines the seams between layers:
//! - `Storage`: the committed, versioned byte store (implemented by `strata-storage`)
//! - `SnapshotView`: a point-in-time read view used by transactions
//! - `Tx`: the narrow transaction handle consumed by entity stores
//!
//! Entity stores only ever see `&mut dyn Tx`. Swapping the engine underneath
//! (in-memory, on-disk, remote) does not touch the store layer.

use crate::error::StrataResult;
use crate::types::{BucketKey, BucketName, Cursor, ScanRange, VersionedValue, WriteBatch};

/// Committed storage backend
///
/// Thread safety: All methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait Storage: Send + Sync {
    /// Highest commit version applied so far
    fn current_version(&self) -> u64;

    /// Version of the record at `key`, or 0 if it does not exist
    ///
    /// Used by commit validation to detect read-write conflicts.
    fn get_version(&self, key: &BucketKey) -> StrataResult<u64>;

    /// Check whether a bucket has been created
    fn bucket_exists(&self, bucket: &BucketName) -> bool;

    /// Apply a transaction's writes with a single commit version
    ///
    /// Bucket creations are applied first, then puts, then deletes.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if a write targets a bucket that neither
    /// exists nor is created by the same batch.
    fn apply_batch(&self, batch: &WriteBatch, version: u64) -> StrataResult<()>;
}

/// Snapshot view abstraction for snapshot isolation
///
/// Provides a version-bounded read view of storage.
///
/// Thread safety: Must be safe to pass between threads (Send + Sync).
pub trait SnapshotView: Send + Sync {
    /// Get value from snapshot
    ///
    /// Returns None if the key didn't exist at the snapshot version.
    fn get(&self, key: &BucketKey) -> StrataResult<Option<VersionedValue>>;

    /// Scan a bucket in ascending key order
    ///
    /// Only keys starting with `prefix` are returned when one is given.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if the bucket did not exist at the snapshot version.
    fn scan(
        &self,
        bucket: &BucketName,
        prefix: Option<&[u8]>,
    ) -> StrataResult<Vec<(Vec<u8>, VersionedValue)>>;

    /// Check whether a bucket existed at the snapshot version
    fn bucket_exists(&self, bucket: &BucketName) -> bool;

    /// Version this snapshot was created at
    fn version(&self) -> u64;
}

/// Transaction handle
///
/// Grants access to named buckets within one atomic unit of work. Writes are
/// invisible to other transactions until commit; reads see the transaction's
/// own writes.
///
/// Every method fails with a cancellation-class error once the transaction
/// has been cancelled or has exceeded its time budget.
pub trait Tx {
    /// Identifier of this transaction (for logs and errors)
    fn txn_id(&self) -> u64;

    /// Whether this transaction accepts writes
    fn is_writable(&self) -> bool;

    /// Create `bucket` unless it already exists
    fn create_bucket_if_not_exists(&mut self, bucket: &BucketName) -> StrataResult<()>;

    /// Check whether `bucket` exists in this transaction's view
    fn bucket_exists(&mut self, bucket: &BucketName) -> StrataResult<bool>;

    /// Read the value stored at `key`
    fn get(&mut self, bucket: &BucketName, key: &[u8]) -> StrataResult<Option<Vec<u8>>>;

    /// Write `value` at `key`, overwriting any existing value
    fn put(&mut self, bucket: &BucketName, key: &[u8], value: Vec<u8>) -> StrataResult<()>;

    /// Remove `key`; deleting a missing key is not an error
    fn delete(&mut self, bucket: &BucketName, key: &[u8]) -> StrataResult<()>;

    /// Scan `bucket` over `range`
    ///
    /// Keys are visited in lexicographic byte order (reversed when the range
    /// is descending).
    fn scan(&mut self, bucket: &BucketName, range: &ScanRange) -> StrataResult<Cursor>;

    /// Check whether a record exists at `key`
    fn exists(&mut self, bucket: &BucketName, key: &[u8]) -> StrataResult<bool> {
        Ok(self.get(bucket, key)?.is_some())
    }
}
