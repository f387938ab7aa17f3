//! Concurrency layer for Strata
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - TransactionContext: Read/write set tracking, implements `Tx`
//! - Snapshot isolation over `ClonedSnapshotView`
//! - Conflict detection at commit time (first-committer-wins)
//! - TransactionManager: serialized validate-and-apply commits

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;
pub mod validation;

pub use manager::TransactionManager;
pub use transaction::{
    ActiveGuard, CommitError, PendingOperations, TransactionContext, TransactionStatus,
};
pub use validation::{validate_read_set, validate_transaction, ConflictType, ValidationResult};
