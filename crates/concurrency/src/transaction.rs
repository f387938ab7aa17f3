//! Transaction context for OCC
//!
//! This module implements the core transaction data structure for optimistic
//! concurrency control. TransactionContext tracks all reads, writes, deletes
//! and bucket creations of a transaction, enabling validation at commit time.
//!
//! `TransactionContext` implements [`Tx`], the handle entity stores work
//! against.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use strata_core::{
    BucketKey, BucketName, CancellationToken, Cursor, ScanRange, SnapshotView, Storage,
    StrataError, StrataResult, Tx, WriteBatch,
};

use crate::validation::{validate_transaction, ValidationResult};

/// Error type for commit failures
#[derive(Debug, Clone)]
pub enum CommitError {
    /// Transaction aborted due to read-set conflicts
    ValidationFailed(ValidationResult),

    /// Transaction was not in correct state for commit
    ///
    /// Commit requires Active state to transition to Validating
    InvalidState(String),

    /// Validation could not read current storage versions
    Storage(String),
}

impl std::fmt::Display for CommitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitError::ValidationFailed(result) => {
                write!(f, "Commit failed: {} conflict(s)", result.conflict_count())
            }
            CommitError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            CommitError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for CommitError {}

// Conversion to StrataError
impl From<CommitError> for StrataError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::ValidationFailed(result) => {
                let first = result
                    .conflicts
                    .first()
                    .map(|c| format!(": {}", c))
                    .unwrap_or_default();
                StrataError::TransactionAborted {
                    reason: format!(
                        "validation failed with {} conflict(s){}",
                        result.conflict_count(),
                        first
                    ),
                }
            }
            CommitError::InvalidState(msg) => StrataError::TransactionNotActive { state: msg },
            CommitError::Storage(msg) => StrataError::storage(msg),
        }
    }
}

/// Summary of buffered operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperations {
    /// Buckets to create
    pub buckets: usize,
    /// Records to write
    pub puts: usize,
    /// Records to delete
    pub deletes: usize,
}

impl PendingOperations {
    /// Total number of pending operations
    pub fn total(&self) -> usize {
        self.buckets + self.puts + self.deletes
    }

    /// Check if there are no pending operations
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Status of a transaction
///
/// State transitions:
/// - `Active` → `Validating` (begin commit)
/// - `Validating` → `Committed` (validation passed)
/// - `Validating` → `Aborted` (conflict detected)
/// - `Active` → `Aborted` (rollback or error)
///
/// Terminal states (no transitions allowed):
/// - `Committed`
/// - `Aborted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Transaction is being validated for conflicts
    Validating,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

/// One slot in a live-transaction counter
///
/// Creating the guard increments the counter; dropping it decrements it.
/// A transaction holding a guard therefore stays counted until it finishes
/// or is dropped, whichever comes first.
#[derive(Debug)]
pub struct ActiveGuard(Arc<AtomicU64>);

impl ActiveGuard {
    /// Count one more live transaction on `counter`
    pub fn new(counter: Arc<AtomicU64>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        ActiveGuard(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        // Saturating decrement to prevent underflow
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
    }
}

/// Transaction context for OCC with snapshot isolation
///
/// # Read-Your-Writes
///
/// Reads check, in order:
/// 1. **write_set**: Returns uncommitted write from this transaction
/// 2. **delete_set**: Returns None for uncommitted delete
/// 3. **snapshot**: Returns value from snapshot, tracks in read_set
///
/// # Lifecycle
///
/// 1. **BEGIN**: Create with `with_snapshot()`, status is `Active`
/// 2. **READ/WRITE**: Use the [`Tx`] methods
/// 3. **COMMIT/ABORT**: `commit()` validates; `mark_aborted()` discards
pub struct TransactionContext {
    /// Unique transaction ID
    pub txn_id: u64,

    /// Version at transaction start (snapshot version)
    pub start_version: u64,

    /// Snapshot view for this transaction
    snapshot: Box<dyn SnapshotView>,

    /// Keys read and their versions (for validation)
    ///
    /// Version 0 means the key did not exist when read.
    pub read_set: HashMap<BucketKey, u64>,

    /// Keys written with their new values (buffered)
    pub write_set: HashMap<BucketKey, Vec<u8>>,

    /// Keys to delete (buffered)
    pub delete_set: HashSet<BucketKey>,

    /// Buckets created by this transaction (buffered)
    pub created_buckets: BTreeSet<BucketName>,

    /// Current transaction status
    pub status: TransactionStatus,

    writable: bool,
    timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
    start_time: Instant,
    active: Option<ActiveGuard>,
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("start_version", &self.start_version)
            .field("status", &self.status)
            .field("writable", &self.writable)
            .field("pending", &self.pending_operations())
            .finish()
    }
}

impl TransactionContext {
    /// Create a new read-write transaction over `snapshot`
    ///
    /// # Example
    ///
    /// ```
    /// use strata_concurrency::TransactionContext;
    /// use strata_storage::ClonedSnapshotView;
    ///
    /// let txn = TransactionContext::with_snapshot(1, Box::new(ClonedSnapshotView::empty()));
    /// assert!(txn.is_active());
    /// assert_eq!(txn.start_version, 0);
    /// ```
    pub fn with_snapshot(txn_id: u64, snapshot: Box<dyn SnapshotView>) -> Self {
        let start_version = snapshot.version();
        TransactionContext {
            txn_id,
            start_version,
            snapshot,
            read_set: HashMap::new(),
            write_set: HashMap::new(),
            delete_set: HashSet::new(),
            created_buckets: BTreeSet::new(),
            status: TransactionStatus::Active,
            writable: true,
            timeout: None,
            cancellation: None,
            start_time: Instant::now(),
            active: None,
        }
    }

    /// Reject every write made through this transaction
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Fail operations once the transaction has run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fail operations once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Hold `guard` until the transaction is released or dropped
    pub fn with_active_guard(mut self, guard: ActiveGuard) -> Self {
        self.active = Some(guard);
        self
    }

    /// Give up the active guard, if any
    ///
    /// Called once the transaction has committed or aborted.
    pub fn release_active_guard(&mut self) {
        self.active = None;
    }

    // === State Management ===

    /// Check if transaction is in Active state
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Check if transaction is committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed)
    }

    /// Check if transaction is aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// Reason the transaction was aborted, if it was
    pub fn abort_reason(&self) -> Option<&str> {
        match &self.status {
            TransactionStatus::Aborted { reason } => Some(reason),
            _ => None,
        }
    }

    /// Get the elapsed time since transaction started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check if this transaction has exceeded its timeout
    pub fn is_expired(&self) -> bool {
        self.timeout.map_or(false, |t| self.elapsed() > t)
    }

    /// Check if transaction can accept operations
    ///
    /// # Errors
    ///
    /// - `TransactionNotActive` if not in `Active` state
    /// - `Cancelled` if the cancellation token was tripped
    /// - `TransactionTimeout` if the timeout has elapsed
    pub fn ensure_active(&self) -> StrataResult<()> {
        if !self.is_active() {
            return Err(StrataError::TransactionNotActive {
                state: format!("transaction {} is {:?}", self.txn_id, self.status),
            });
        }
        if self
            .cancellation
            .as_ref()
            .map_or(false, CancellationToken::is_cancelled)
        {
            return Err(StrataError::Cancelled);
        }
        if let Some(timeout) = self.timeout {
            let elapsed = self.elapsed();
            if elapsed > timeout {
                return Err(StrataError::TransactionTimeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }
        Ok(())
    }

    fn ensure_writable(&self) -> StrataResult<()> {
        self.ensure_active()?;
        if self.writable {
            Ok(())
        } else {
            Err(StrataError::TransactionReadOnly {
                txn_id: self.txn_id,
            })
        }
    }

    fn has_bucket(&self, bucket: &BucketName) -> bool {
        self.created_buckets.contains(bucket) || self.snapshot.bucket_exists(bucket)
    }

    fn require_bucket(&self, bucket: &BucketName) -> StrataResult<()> {
        if self.has_bucket(bucket) {
            Ok(())
        } else {
            Err(StrataError::BucketNotFound {
                bucket: bucket.to_string(),
            })
        }
    }

    /// Read from snapshot and track in read_set
    fn read_from_snapshot(&mut self, key: BucketKey) -> StrataResult<Option<Vec<u8>>> {
        match self.snapshot.get(&key)? {
            Some(vv) => {
                self.read_set.insert(key, vv.version);
                Ok(Some(vv.value))
            }
            None => {
                // Someone creating this key before we commit is a conflict
                self.read_set.insert(key, 0);
                Ok(None)
            }
        }
    }

    /// Transition to Aborted, discarding buffered operations
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotActive` if already `Committed` or `Aborted`.
    pub fn mark_aborted(&mut self, reason: impl Into<String>) -> StrataResult<()> {
        match &self.status {
            TransactionStatus::Committed | TransactionStatus::Aborted { .. } => {
                Err(StrataError::TransactionNotActive {
                    state: format!(
                        "cannot abort transaction {} from {:?}",
                        self.txn_id, self.status
                    ),
                })
            }
            _ => {
                self.status = TransactionStatus::Aborted {
                    reason: reason.into(),
                };
                // Aborted transactions write nothing
                self.write_set.clear();
                self.delete_set.clear();
                self.created_buckets.clear();
                Ok(())
            }
        }
    }

    /// Get summary of pending operations
    pub fn pending_operations(&self) -> PendingOperations {
        PendingOperations {
            buckets: self.created_buckets.len(),
            puts: self.write_set.len(),
            deletes: self.delete_set.len(),
        }
    }

    /// Check if the transaction would change anything on commit
    pub fn has_pending_operations(&self) -> bool {
        !self.pending_operations().is_empty()
    }

    // === Commit Operation ===

    /// Validate the transaction and mark it committed
    ///
    /// 1. Transition to Validating state
    /// 2. Run validation against current storage
    /// 3. If valid: transition to Committed
    /// 4. If invalid: transition to Aborted
    ///
    /// Writes are applied separately with [`TransactionContext::write_batch`]
    /// and [`Storage::apply_batch`].
    pub fn commit<S: Storage + ?Sized>(&mut self, store: &S) -> Result<(), CommitError> {
        if !self.is_active() {
            return Err(CommitError::InvalidState(format!(
                "cannot commit transaction {} from {:?} state - must be Active",
                self.txn_id, self.status
            )));
        }
        self.status = TransactionStatus::Validating;

        let validation_result = match validate_transaction(self, store) {
            Ok(result) => result,
            Err(e) => {
                self.status = TransactionStatus::Aborted {
                    reason: e.to_string(),
                };
                return Err(CommitError::Storage(e.to_string()));
            }
        };

        if !validation_result.is_valid() {
            self.status = TransactionStatus::Aborted {
                reason: format!(
                    "commit failed: {} conflict(s) detected",
                    validation_result.conflict_count()
                ),
            };
            return Err(CommitError::ValidationFailed(validation_result));
        }

        self.status = TransactionStatus::Committed;
        Ok(())
    }

    /// Collect the buffered operations into a write batch
    pub fn write_batch(&self) -> WriteBatch {
        WriteBatch {
            buckets: self.created_buckets.clone(),
            puts: self
                .write_set
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            deletes: self.delete_set.iter().cloned().collect(),
        }
    }
}

impl Tx for TransactionContext {
    fn txn_id(&self) -> u64 {
        self.txn_id
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn create_bucket_if_not_exists(&mut self, bucket: &BucketName) -> StrataResult<()> {
        self.ensure_active()?;
        if self.has_bucket(bucket) {
            return Ok(());
        }
        self.ensure_writable()?;
        self.created_buckets.insert(bucket.clone());
        Ok(())
    }

    fn bucket_exists(&mut self, bucket: &BucketName) -> StrataResult<bool> {
        self.ensure_active()?;
        Ok(self.has_bucket(bucket))
    }

    fn get(&mut self, bucket: &BucketName, key: &[u8]) -> StrataResult<Option<Vec<u8>>> {
        self.ensure_active()?;
        self.require_bucket(bucket)?;

        let key = BucketKey::new(bucket.clone(), key);
        if let Some(value) = self.write_set.get(&key) {
            return Ok(Some(value.clone()));
        }
        if self.delete_set.contains(&key) {
            return Ok(None);
        }
        self.read_from_snapshot(key)
    }

    fn put(&mut self, bucket: &BucketName, key: &[u8], value: Vec<u8>) -> StrataResult<()> {
        self.ensure_writable()?;
        self.require_bucket(bucket)?;

        let key = BucketKey::new(bucket.clone(), key);
        self.delete_set.remove(&key);
        self.write_set.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, bucket: &BucketName, key: &[u8]) -> StrataResult<()> {
        self.ensure_writable()?;
        self.require_bucket(bucket)?;

        let key = BucketKey::new(bucket.clone(), key);
        self.write_set.remove(&key);
        self.delete_set.insert(key);
        Ok(())
    }

    /// Scan merges the snapshot with this transaction's buffered writes
    ///
    /// - Includes uncommitted writes from this transaction in range
    /// - Excludes uncommitted deletes from this transaction
    /// - Tracks every snapshot key returned in read_set
    fn scan(&mut self, bucket: &BucketName, range: &ScanRange) -> StrataResult<Cursor> {
        self.ensure_active()?;
        self.require_bucket(bucket)?;

        let snapshot_results = if self.snapshot.bucket_exists(bucket) {
            self.snapshot.scan(bucket, range.prefix.as_deref())?
        } else {
            Vec::new()
        };

        let mut results: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for (key, vv) in snapshot_results {
            if !range.matches(&key) {
                continue;
            }
            let bucket_key = BucketKey::new(bucket.clone(), &key);
            if self.delete_set.contains(&bucket_key) {
                continue;
            }
            self.read_set.insert(bucket_key, vv.version);
            results.insert(key, vv.value);
        }

        for (key, value) in &self.write_set {
            if &key.bucket == bucket && range.matches(&key.key) {
                results.insert(key.key.clone(), value.clone());
            }
        }

        Ok(Cursor::from_sorted(results, range.descending))
    }
}
