//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by orchestrating:
//! 1. Validation (first-committer-wins)
//! 2. Storage application (visibility)
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Acquire the commit lock
//! 2. ensure_active() - reject cancelled or timed-out transactions
//! 3. commit() - Active → Validating → Committed, or Aborted on conflict
//! 4. Allocate commit_version (increment global version)
//! 5. apply_batch() to storage with commit_version
//! 6. Return Ok(commit_version)
//! ```
//!
//! Validation and application happen under one lock, so no other commit can
//! slip in between the check and the write.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use strata_core::{Storage, StrataResult};

use crate::TransactionContext;

/// Manages transaction lifecycle and atomic commits
///
/// Global version counter is incremented once per writing transaction.
/// All keys in a transaction get the same commit version.
#[derive(Debug)]
pub struct TransactionManager {
    /// Global version counter
    ///
    /// Monotonically increasing. Each committed write transaction increments by 1.
    version: AtomicU64,

    /// Next transaction ID
    next_txn_id: AtomicU64,

    /// Serializes validate-and-apply
    commit_lock: Mutex<()>,
}

impl TransactionManager {
    /// Create a new transaction manager
    ///
    /// # Arguments
    /// * `initial_version` - Starting version (the store's current version)
    pub fn new(initial_version: u64) -> Self {
        Self::with_txn_id(initial_version, 0)
    }

    /// Create a new transaction manager with specific starting txn_id
    ///
    /// # Arguments
    /// * `initial_version` - Starting version
    /// * `max_txn_id` - Highest txn_id already handed out (new transactions start at max_txn_id + 1)
    pub fn with_txn_id(initial_version: u64, max_txn_id: u64) -> Self {
        TransactionManager {
            version: AtomicU64::new(initial_version),
            next_txn_id: AtomicU64::new(max_txn_id + 1),
            commit_lock: Mutex::new(()),
        }
    }

    /// Get current global version
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Allocate next commit version (increment global version)
    pub fn allocate_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Commit a transaction atomically
    ///
    /// Transactions without buffered writes commit without touching storage
    /// and return the current version.
    ///
    /// # Errors
    ///
    /// - `Cancelled` / `TransactionTimeout` if the transaction can no longer run
    /// - `TransactionAborted` if validation found conflicts
    /// - `TransactionNotActive` if the transaction was already finished
    /// - any storage error from applying the batch
    pub fn commit<S: Storage + ?Sized>(
        &self,
        txn: &mut TransactionContext,
        store: &S,
    ) -> StrataResult<u64> {
        let _guard = self.commit_lock.lock();

        txn.ensure_active()?;
        if let Err(e) = txn.commit(store) {
            warn!(
                target: "strata::txn",
                txn_id = txn.txn_id,
                error = %e,
                "transaction aborted at commit"
            );
            return Err(e.into());
        }

        if !txn.has_pending_operations() {
            return Ok(self.current_version());
        }

        let commit_version = self.allocate_version();
        let batch = txn.write_batch();
        store.apply_batch(&batch, commit_version)?;

        debug!(
            target: "strata::txn",
            txn_id = txn.txn_id,
            commit_version,
            operations = batch.len(),
            "transaction committed"
        );
        Ok(commit_version)
    }

    /// Explicitly abort a transaction
    ///
    /// All buffered operations are discarded.
    pub fn abort(&self, txn: &mut TransactionContext, reason: impl Into<String>) -> StrataResult<()> {
        txn.mark_aborted(reason)
    }

    /// Commit with automatic rollback on failure
    ///
    /// Ensures the transaction ends in the Aborted state if commit fails
    /// before validation ran (e.g. it was cancelled).
    pub fn commit_or_rollback<S: Storage + ?Sized>(
        &self,
        txn: &mut TransactionContext,
        store: &S,
    ) -> StrataResult<u64> {
        match self.commit(txn, store) {
            Ok(version) => Ok(version),
            Err(e) => {
                if txn.is_active() {
                    // Already-finished transactions keep their state
                    let _ = txn.mark_aborted(format!("commit failed: {}", e));
                }
                Err(e)
            }
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(0)
    }
}
