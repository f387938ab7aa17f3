//! Transaction validation for OCC
//!
//! Key rules:
//! - First-committer-wins based on READ-SET, not write-set
//! - Blind writes (write without read) do NOT conflict
//! - A key read as absent is recorded at version 0; creating it concurrently
//!   is a conflict
//! - Write skew is ALLOWED (do not try to prevent it)

use std::collections::HashMap;

use strata_core::{display_key, BucketKey, Storage, StrataError, StrataResult};

use crate::transaction::TransactionContext;

/// Types of conflicts that can occur during transaction validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// Read-write conflict: key was read at one version but current version differs
    ReadWriteConflict {
        /// The key that has a conflict
        key: BucketKey,
        /// Version recorded in read_set when read
        read_version: u64,
        /// Current version in storage at validation time
        current_version: u64,
    },
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictType::ReadWriteConflict {
                key,
                read_version,
                current_version,
            } => write!(
                f,
                "{}/{} read at version {} but is now at version {}",
                key.bucket,
                display_key(&key.key),
                read_version,
                current_version
            ),
        }
    }
}

/// Result of transaction validation
///
/// Accumulates all conflicts found during validation.
/// A transaction commits only if is_valid() returns true.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Create a successful validation result (no conflicts)
    pub fn ok() -> Self {
        ValidationResult {
            conflicts: Vec::new(),
        }
    }

    /// Create a validation result with a single conflict
    pub fn conflict(conflict: ConflictType) -> Self {
        ValidationResult {
            conflicts: vec![conflict],
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.conflicts.extend(other.conflicts);
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Validate the read-set against current storage state
///
/// For each key in read_set, check if current version matches read version.
/// If any version changed, report ReadWriteConflict.
///
/// # Errors
///
/// A storage failure aborts validation with an `Internal` error so that a
/// transaction is never committed on an unchecked read.
pub fn validate_read_set<S: Storage + ?Sized>(
    read_set: &HashMap<BucketKey, u64>,
    store: &S,
) -> StrataResult<ValidationResult> {
    let mut result = ValidationResult::ok();

    for (key, read_version) in read_set {
        let current_version = store.get_version(key).map_err(|e| {
            StrataError::wrap_internal(
                format!(
                    "storage error during read-set validation for {}/{}",
                    key.bucket,
                    display_key(&key.key)
                ),
                e,
            )
        })?;

        if current_version != *read_version {
            result.conflicts.push(ConflictType::ReadWriteConflict {
                key: key.clone(),
                read_version: *read_version,
                current_version,
            });
        }
    }

    Ok(result)
}

/// Validate a complete transaction against current storage state
///
/// Transactions without pending writes always validate: they simply return
/// their snapshot view.
pub fn validate_transaction<S: Storage + ?Sized>(
    txn: &TransactionContext,
    store: &S,
) -> StrataResult<ValidationResult> {
    if !txn.has_pending_operations() {
        return Ok(ValidationResult::ok());
    }

    validate_read_set(&txn.read_set, store)
}
