//! Transaction coordinator for managing transaction lifecycle
//!
//! The TransactionCoordinator wraps TransactionManager and adds:
//! - Snapshot creation and per-transaction settings (timeout, read-only)
//! - Active transaction tracking
//! - Transaction metrics (started, committed, aborted)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strata_concurrency::{ActiveGuard, TransactionContext, TransactionManager};
use strata_core::{CancellationToken, StrataResult};
use strata_storage::UnifiedStore;
use tracing::debug;

/// Options applied to a transaction when it starts
#[derive(Debug, Clone, Default)]
pub struct TxnOptions {
    /// Reject writes
    pub read_only: bool,
    /// Fail operations after this long
    pub timeout: Option<Duration>,
    /// Fail operations once cancelled
    pub cancellation: Option<CancellationToken>,
}

/// Coordinates transaction start, commit and abort
#[derive(Debug)]
pub struct TransactionCoordinator {
    manager: TransactionManager,
    active_count: Arc<AtomicU64>,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
}

impl TransactionCoordinator {
    /// Create a coordinator starting at `initial_version`
    pub fn new(initial_version: u64) -> Self {
        Self {
            manager: TransactionManager::new(initial_version),
            active_count: Arc::new(AtomicU64::new(0)),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_aborted: AtomicU64::new(0),
        }
    }

    /// Start a transaction over a fresh snapshot of `storage`
    ///
    /// The transaction counts as active until it commits, aborts or is
    /// dropped.
    pub fn start_transaction(
        &self,
        storage: &UnifiedStore,
        options: TxnOptions,
    ) -> TransactionContext {
        let txn_id = self.manager.next_txn_id();
        let snapshot = storage.create_snapshot();

        let mut txn = TransactionContext::with_snapshot(txn_id, Box::new(snapshot))
            .with_active_guard(ActiveGuard::new(Arc::clone(&self.active_count)));
        if options.read_only {
            txn = txn.read_only();
        }
        if let Some(timeout) = options.timeout {
            txn = txn.with_timeout(timeout);
        }
        if let Some(token) = options.cancellation {
            txn = txn.with_cancellation(token);
        }

        self.total_started.fetch_add(1, Ordering::Relaxed);

        debug!(
            target: "strata::txn",
            txn_id,
            start_version = txn.start_version,
            read_only = options.read_only,
            "transaction started"
        );
        txn
    }

    /// Commit a transaction, recording the outcome
    pub fn commit(&self, txn: &mut TransactionContext, store: &UnifiedStore) -> StrataResult<u64> {
        match self.manager.commit_or_rollback(txn, store) {
            Ok(version) => {
                self.record_commit(txn);
                Ok(version)
            }
            Err(e) => {
                self.record_abort(txn);
                Err(e)
            }
        }
    }

    /// Abort a transaction, discarding its writes
    pub fn abort(&self, txn: &mut TransactionContext, reason: &str) -> StrataResult<()> {
        self.manager.abort(txn, reason)?;
        self.record_abort(txn);
        debug!(target: "strata::txn", txn_id = txn.txn_id, reason, "transaction rolled back");
        Ok(())
    }

    fn record_commit(&self, txn: &mut TransactionContext) {
        txn.release_active_guard();
        self.total_committed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_abort(&self, txn: &mut TransactionContext) {
        txn.release_active_guard();
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Current global version
    pub fn current_version(&self) -> u64 {
        self.manager.current_version()
    }

    /// Snapshot of the transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: self.total_started.load(Ordering::Relaxed),
            total_committed: self.total_committed.load(Ordering::Relaxed),
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
        }
    }
}

/// Transaction counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Transactions started but not yet finished
    pub active_count: u64,
    /// Transactions started
    pub total_started: u64,
    /// Transactions committed
    pub total_committed: u64,
    /// Transactions aborted or rolled back
    pub total_aborted: u64,
}

impl TransactionMetrics {
    /// Committed plus aborted
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_aborted
    }
}
