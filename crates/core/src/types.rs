//! Core types for Strata entity storage
//!
//! This module defines the foundational types:
//! - BucketName: Name of a byte-ordered keyspace
//! - BucketKey: Composite key (bucket + key bytes) used by the engine
//! - ScanRange: Prefix / seek / direction for range scans
//! - Cursor: Finite, ordered batch of scan results
//! - WriteBatch: Buffered writes of one transaction, applied at commit

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Name of a bucket
///
/// A bucket is an independent keyspace whose keys sort lexicographically by
/// their bytes. Entity stores own exactly one bucket each.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketName(String);

impl BucketName {
    /// Create a bucket name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BucketName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for BucketName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Composite key addressing one record in the engine
///
/// Orders by bucket first, then key bytes, so a `BTreeMap<BucketKey, _>`
/// keeps every bucket contiguous and sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    /// Bucket the record lives in
    pub bucket: BucketName,
    /// Raw key bytes inside the bucket
    pub key: Vec<u8>,
}

impl BucketKey {
    /// Create a new bucket key
    pub fn new(bucket: BucketName, key: impl AsRef<[u8]>) -> Self {
        Self {
            bucket,
            key: key.as_ref().to_vec(),
        }
    }
}

/// A key/value pair returned by a scan
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Range description for bucket scans
///
/// - `prefix`: only keys starting with these bytes
/// - `after`: resume strictly after this key, in scan direction
/// - `descending`: visit keys from largest to smallest
///
/// # Example
///
/// ```
/// use strata_core::ScanRange;
///
/// let range = ScanRange::all().with_prefix(b"user:").descending();
/// assert!(range.matches(b"user:alice"));
/// assert!(!range.matches(b"org:acme"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRange {
    /// Only keys starting with these bytes
    pub prefix: Option<Vec<u8>>,
    /// Resume strictly after this key
    pub after: Option<Vec<u8>>,
    /// Visit keys in reverse byte order
    pub descending: bool,
}

impl ScanRange {
    /// Scan the whole bucket in ascending order
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict the scan to keys starting with `prefix`
    pub fn with_prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = Some(prefix.as_ref().to_vec());
        self
    }

    /// Resume strictly after `key`
    pub fn with_after(mut self, key: impl AsRef<[u8]>) -> Self {
        self.after = Some(key.as_ref().to_vec());
        self
    }

    /// Visit keys from largest to smallest
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Check whether `key` falls inside this range
    pub fn matches(&self, key: &[u8]) -> bool {
        if let Some(prefix) = &self.prefix {
            if !key.starts_with(prefix) {
                return false;
            }
        }
        match &self.after {
            Some(after) if self.descending => key < after.as_slice(),
            Some(after) => key > after.as_slice(),
            None => true,
        }
    }
}

/// Ordered scan results
///
/// A cursor is finite and can be consumed once. Entries are already in scan
/// order when the cursor is built.
#[derive(Debug)]
pub struct Cursor {
    entries: std::vec::IntoIter<KvPair>,
}

impl Cursor {
    /// Build a cursor from entries that are already in scan order
    pub fn new(entries: Vec<KvPair>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }

    /// A cursor with no entries
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Build a cursor from a sorted map, honoring the scan direction
    pub fn from_sorted(entries: BTreeMap<Vec<u8>, Vec<u8>>, descending: bool) -> Self {
        if descending {
            Self::new(entries.into_iter().rev().collect())
        } else {
            Self::new(entries.into_iter().collect())
        }
    }

    /// Number of entries not yet consumed
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl Iterator for Cursor {
    type Item = KvPair;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

/// A stored value together with the commit version that wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    /// Raw stored bytes
    pub value: Vec<u8>,
    /// Commit version of the write (always > 0)
    pub version: u64,
}

impl VersionedValue {
    /// Create a new versioned value
    pub fn new(value: Vec<u8>, version: u64) -> Self {
        Self { value, version }
    }
}

/// Buffered writes of a transaction
///
/// Applied to storage as one unit with a single commit version.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    /// Buckets created by the transaction
    pub buckets: BTreeSet<BucketName>,
    /// Records written by the transaction
    pub puts: BTreeMap<BucketKey, Vec<u8>>,
    /// Records deleted by the transaction
    pub deletes: BTreeSet<BucketKey>,
}

impl WriteBatch {
    /// Check if the batch changes nothing
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.puts.is_empty() && self.deletes.is_empty()
    }

    /// Total number of buffered operations
    pub fn len(&self) -> usize {
        self.buckets.len() + self.puts.len() + self.deletes.len()
    }
}
