//! Scan, delete and put options for entity stores

use std::fmt;

use strata_core::{ScanRange, StrataResult, Tx};

type Predicate<'a, T> = Box<dyn Fn(&[u8], &T) -> bool + 'a>;

/// Callback run for every record a batch delete removes
///
/// Receives the same transaction plus the matched key and decoded value.
/// Returning an error aborts the delete.
pub type DeleteRelationFn<'a, T> = Box<dyn FnMut(&mut dyn Tx, &[u8], &T) -> StrataResult<()> + 'a>;

/// Options for [`EntityStore::find`](crate::EntityStore::find)
///
/// Offset and limit count records that passed the filter.
///
/// # Cost
///
/// Only `prefix`, `after` and `descending` narrow what the transaction reads.
/// `offset`, `limit`, the filter and `stop_when` apply while decoding, after
/// every key in the range has been read and added to the read set. A narrow
/// `prefix` or `after` bound keeps large buckets cheap to page through.
///
/// # Example
///
/// ```
/// use strata_kv::FindOptions;
///
/// let options: FindOptions<'_, String> = FindOptions::new()
///     .prefix(b"user:")
///     .descending()
///     .offset(10)
///     .limit(5)
///     .filter(|_, name: &String| !name.is_empty());
/// assert_eq!(options.offset, 10);
/// ```
pub struct FindOptions<'a, T> {
    /// Only keys starting with these bytes
    pub prefix: Option<Vec<u8>>,
    /// Resume strictly after this key
    pub after: Option<Vec<u8>>,
    /// Visit keys in reverse byte order
    pub descending: bool,
    /// Filtered records to skip before yielding
    pub offset: usize,
    /// Maximum number of records to yield
    pub limit: Option<usize>,
    filter: Option<Predicate<'a, T>>,
    stop: Option<Predicate<'a, T>>,
}

impl<'a, T> FindOptions<'a, T> {
    /// Scan everything in ascending order
    pub fn new() -> Self {
        Self {
            prefix: None,
            after: None,
            descending: false,
            offset: 0,
            limit: None,
            filter: None,
            stop: None,
        }
    }

    /// Restrict to keys starting with `prefix`
    pub fn prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = Some(prefix.as_ref().to_vec());
        self
    }

    /// Resume strictly after `key`
    pub fn after(mut self, key: impl AsRef<[u8]>) -> Self {
        self.after = Some(key.as_ref().to_vec());
        self
    }

    /// Visit keys from largest to smallest
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Skip the first `offset` matching records
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Yield at most `limit` records
    ///
    /// Bounds decoding only; the whole range is still read.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Keep only records for which `f` returns true
    pub fn filter(mut self, f: impl Fn(&[u8], &T) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(f));
        self
    }

    /// End the scan at the first matching record for which `f` returns true
    ///
    /// That record is not yielded.
    pub fn stop_when(mut self, f: impl Fn(&[u8], &T) -> bool + 'a) -> Self {
        self.stop = Some(Box::new(f));
        self
    }

    pub(crate) fn scan_range(&self) -> ScanRange {
        ScanRange {
            prefix: self.prefix.clone(),
            after: self.after.clone(),
            descending: self.descending,
        }
    }

    pub(crate) fn accepts(&self, key: &[u8], value: &T) -> bool {
        self.filter.as_ref().map_or(true, |f| f(key, value))
    }

    pub(crate) fn should_stop(&self, key: &[u8], value: &T) -> bool {
        self.stop.as_ref().map_or(false, |f| f(key, value))
    }
}

impl<T> Default for FindOptions<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FindOptions<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FindOptions")
            .field("prefix", &self.prefix)
            .field("after", &self.after)
            .field("descending", &self.descending)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("filter", &self.filter.is_some())
            .field("stop", &self.stop.is_some())
            .finish()
    }
}

/// Options for [`EntityStore::delete`](crate::EntityStore::delete)
pub struct DeleteOptions<'a, T> {
    /// Only keys starting with these bytes
    pub prefix: Option<Vec<u8>>,
    filter: Option<Predicate<'a, T>>,
    pub(crate) relations: Vec<DeleteRelationFn<'a, T>>,
}

impl<'a, T> DeleteOptions<'a, T> {
    /// Match every record in the bucket
    pub fn new() -> Self {
        Self {
            prefix: None,
            filter: None,
            relations: Vec::new(),
        }
    }

    /// Restrict to keys starting with `prefix`
    pub fn prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = Some(prefix.as_ref().to_vec());
        self
    }

    /// Delete only records for which `f` returns true
    pub fn filter(mut self, f: impl Fn(&[u8], &T) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(f));
        self
    }

    /// Register a callback to run before each matched record is removed
    ///
    /// Callbacks run in registration order.
    pub fn relation(
        mut self,
        f: impl FnMut(&mut dyn Tx, &[u8], &T) -> StrataResult<()> + 'a,
    ) -> Self {
        self.relations.push(Box::new(f));
        self
    }

    /// Number of registered relation callbacks
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub(crate) fn scan_range(&self) -> ScanRange {
        ScanRange {
            prefix: self.prefix.clone(),
            after: None,
            descending: false,
        }
    }

    pub(crate) fn accepts(&self, key: &[u8], value: &T) -> bool {
        self.filter.as_ref().map_or(true, |f| f(key, value))
    }
}

impl<T> Default for DeleteOptions<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DeleteOptions<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteOptions")
            .field("prefix", &self.prefix)
            .field("filter", &self.filter.is_some())
            .field("relations", &self.relations.len())
            .finish()
    }
}

/// Validation applied by [`IndexedStore::put`](crate::IndexedStore::put)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    /// Create: the unique key must not be held by a live record
    New,
    /// Replace: the primary key must already exist
    Update,
    /// Write without validation (bulk loads, repairs)
    Unchecked,
}
