//! Database struct and transaction API
//!
//! This module provides the main Database struct that orchestrates:
//! - Storage initialization
//! - Configuration
//! - Transaction API
//!
//! ## Transaction API
//!
//! The Database provides two ways to execute transactions:
//!
//! 1. **Closure API** (recommended): `db.update(|txn| { ... })` and
//!    `db.view(|txn| { ... })`
//!    - Automatic commit on success, rollback on error
//!    - Returns the closure's return value
//!
//! 2. **Manual API**: `begin_transaction()` + `commit_transaction()` /
//!    `rollback_transaction()`
//!    - For cases requiring external control over commit timing
//!
//! Closures receive `&mut TransactionContext`, which coerces to the
//! `&mut dyn Tx` handle the entity stores take.

pub mod config;

pub use config::{LoggingConfig, StrataConfig, CONFIG_FILE_NAME};

use std::path::Path;
use std::sync::Arc;

use strata_concurrency::TransactionContext;
use strata_core::{CancellationToken, StrataResult};
use strata_storage::UnifiedStore;
use tracing::info;

use crate::coordinator::{TransactionCoordinator, TransactionMetrics, TxnOptions};

/// Embedded transactional database
///
/// Owns the committed store and the transaction coordinator. Cheap to share
/// behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct Database {
    storage: Arc<UnifiedStore>,
    coordinator: TransactionCoordinator,
    config: StrataConfig,
}

impl Database {
    /// Create an empty in-memory database with default configuration
    pub fn cache() -> Self {
        Self::with_config(StrataConfig::default())
    }

    /// Create an empty in-memory database with `config`
    pub fn with_config(config: StrataConfig) -> Self {
        let storage = Arc::new(UnifiedStore::new());
        let coordinator = TransactionCoordinator::new(0);
        info!(
            target: "strata::db",
            read_only = config.read_only,
            transaction_timeout_ms = config.transaction_timeout_ms,
            "database opened"
        );
        Self {
            storage,
            coordinator,
            config,
        }
    }

    /// Create a database configured from the TOML file at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds invalid values.
    pub fn open_with_config_file<P: AsRef<Path>>(path: P) -> StrataResult<Self> {
        let config = StrataConfig::load(path.as_ref())?;
        Ok(Self::with_config(config))
    }

    /// Active configuration
    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    /// Committed storage backing this database
    pub fn storage(&self) -> &Arc<UnifiedStore> {
        &self.storage
    }

    /// Transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    fn options(&self, writable: bool, cancellation: Option<CancellationToken>) -> TxnOptions {
        TxnOptions {
            read_only: !writable || self.config.read_only,
            timeout: self.config.transaction_timeout(),
            cancellation,
        }
    }

    // ========================================================================
    // Closure API
    // ========================================================================

    /// Execute a read-only transaction
    ///
    /// Writes inside `f` fail with `TransactionReadOnly`.
    ///
    /// # Example
    /// ```
    /// use strata_core::{BucketName, Tx};
    /// use strata_engine::Database;
    ///
    /// let db = Database::cache();
    /// let exists = db.view(|txn| txn.bucket_exists(&BucketName::new("users"))).unwrap();
    /// assert!(!exists);
    /// ```
    pub fn view<F, T>(&self, f: F) -> StrataResult<T>
    where
        F: FnOnce(&mut TransactionContext) -> StrataResult<T>,
    {
        self.run(self.options(false, None), f)
    }

    /// Execute a read-write transaction
    ///
    /// Commits if `f` returns `Ok`; rolls back everything `f` wrote if it
    /// returns `Err`, and returns that error.
    ///
    /// # Example
    /// ```
    /// use strata_core::{BucketName, Tx};
    /// use strata_engine::Database;
    ///
    /// let db = Database::cache();
    /// let users = BucketName::new("users");
    /// db.update(|txn| {
    ///     txn.create_bucket_if_not_exists(&users)?;
    ///     txn.put(&users, b"1", b"alice".to_vec())
    /// })
    /// .unwrap();
    ///
    /// let value = db.view(|txn| txn.get(&users, b"1")).unwrap();
    /// assert_eq!(value, Some(b"alice".to_vec()));
    /// ```
    pub fn update<F, T>(&self, f: F) -> StrataResult<T>
    where
        F: FnOnce(&mut TransactionContext) -> StrataResult<T>,
    {
        self.run(self.options(true, None), f)
    }

    /// Execute a read-write transaction that stops once `token` is cancelled
    pub fn update_with_cancellation<F, T>(&self, token: CancellationToken, f: F) -> StrataResult<T>
    where
        F: FnOnce(&mut TransactionContext) -> StrataResult<T>,
    {
        self.run(self.options(true, Some(token)), f)
    }

    fn run<F, T>(&self, options: TxnOptions, f: F) -> StrataResult<T>
    where
        F: FnOnce(&mut TransactionContext) -> StrataResult<T>,
    {
        let mut txn = self.coordinator.start_transaction(&self.storage, options);
        match f(&mut txn) {
            Ok(value) => {
                self.commit_transaction(&mut txn)?;
                Ok(value)
            }
            Err(e) => {
                self.rollback_transaction(&mut txn)?;
                Err(e)
            }
        }
    }

    // ========================================================================
    // Manual API
    // ========================================================================

    /// Begin a new transaction (for manual control)
    ///
    /// Finish with `commit_transaction()` or `rollback_transaction()`.
    /// Dropping the transaction unfinished discards its writes and removes it
    /// from `metrics().active_count`.
    pub fn begin_transaction(&self, writable: bool) -> TransactionContext {
        self.coordinator
            .start_transaction(&self.storage, self.options(writable, None))
    }

    /// Commit a transaction
    ///
    /// # Returns
    /// * `Ok(commit_version)` - the version assigned to all writes
    ///
    /// # Errors
    /// - `TransactionAborted` - another transaction committed a conflicting write first
    /// - `Cancelled` / `TransactionTimeout` - the transaction can no longer run
    /// - `TransactionNotActive` - the transaction was already finished
    pub fn commit_transaction(&self, txn: &mut TransactionContext) -> StrataResult<u64> {
        self.coordinator.commit(txn, &self.storage)
    }

    /// Roll back a transaction, discarding its writes
    ///
    /// Rolling back a transaction that is no longer active is a no-op.
    pub fn rollback_transaction(&self, txn: &mut TransactionContext) -> StrataResult<()> {
        if !txn.is_active() {
            return Ok(());
        }
        self.coordinator.abort(txn, "rolled back")
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::cache()
    }
}
