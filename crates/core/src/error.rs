//! Error types for Strata entity storage
//!
//! This module defines the single error enum used by every layer of the
//! system, from the bucket engine up to the indexed entity store.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Error Codes
//!
//! Callers branch on the *kind* of failure, not on the concrete variant.
//! Every variant maps to exactly one [`ErrorCode`]:
//!
//! | Code | Meaning |
//! |------|---------|
//! | Invalid | Malformed or underspecified input (no derivable key) |
//! | NotFound | No record at the derived key |
//! | Conflict | Unique-key collision, mismatched update, or OCC abort |
//! | Internal | Unexpected engine or encoding failure |
//! | Cancelled | Transaction cancelled or timed out |

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for Strata operations
pub type StrataResult<T> = std::result::Result<T, StrataError>;

/// Boxed cause attached to wrapping variants
pub type ErrorSource = Box<StrataError>;

/// Canonical error kinds
///
/// These codes are stable: higher layers (REST/RPC handlers) translate them
/// into their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Malformed or underspecified input
    Invalid,
    /// Entity or key not found
    NotFound,
    /// Uniqueness violation or concurrent modification
    Conflict,
    /// Bug, engine failure, or encoding failure
    Internal,
    /// Operation abandoned because its transaction was cancelled
    Cancelled,
}

impl ErrorCode {
    /// Stable string form of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Invalid => "invalid",
            ErrorCode::NotFound => "not found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::Internal => "internal error",
            ErrorCode::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for all Strata operations
#[derive(Debug, Error)]
pub enum StrataError {
    /// Input could not be used (e.g. an entity without identifying fields)
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// No record exists at the requested key
    #[error("not found: {message}")]
    NotFound {
        /// Resource and key that were looked up
        message: String,
        /// Underlying failure, if this error re-classifies another one
        #[source]
        source: Option<ErrorSource>,
    },

    /// Uniqueness violation or mismatched update
    #[error("conflict: {message}")]
    Conflict {
        /// Resource and key that collided
        message: String,
        /// Underlying failure, if any
        #[source]
        source: Option<ErrorSource>,
    },

    /// Unexpected failure wrapped with context
    #[error("internal error: {message}")]
    Internal {
        /// Context for the failure
        message: String,
        /// Underlying failure, if any
        #[source]
        source: Option<ErrorSource>,
    },

    /// Storage layer failure
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure
        message: String,
    },

    /// Encode/decode failure
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the encoding failure
        message: String,
    },

    /// Bucket was never created in this database
    #[error("bucket not found: {bucket}")]
    BucketNotFound {
        /// Name of the missing bucket
        bucket: String,
    },

    /// Transaction is committed or aborted and cannot be used
    #[error("transaction not active: {state}")]
    TransactionNotActive {
        /// Current transaction state
        state: String,
    },

    /// Write attempted through a read-only transaction
    #[error("transaction {txn_id} is read-only")]
    TransactionReadOnly {
        /// Transaction that rejected the write
        txn_id: u64,
    },

    /// Transaction aborted at commit (first committer wins)
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Why the transaction was aborted
        reason: String,
    },

    /// Transaction exceeded its configured time budget
    #[error("transaction timed out after {elapsed_ms}ms (limit {timeout_ms}ms)")]
    TransactionTimeout {
        /// Time spent in the transaction
        elapsed_ms: u64,
        /// Configured limit
        timeout_ms: u64,
    },

    /// Transaction was cancelled through its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StrataError {
    /// Classify this error
    pub fn code(&self) -> ErrorCode {
        match self {
            StrataError::InvalidInput { .. } => ErrorCode::Invalid,
            StrataError::NotFound { .. } => ErrorCode::NotFound,
            StrataError::Conflict { .. } | StrataError::TransactionAborted { .. } => {
                ErrorCode::Conflict
            }
            StrataError::Cancelled | StrataError::TransactionTimeout { .. } => {
                ErrorCode::Cancelled
            }
            StrataError::Internal { .. }
            | StrataError::Storage { .. }
            | StrataError::Serialization { .. }
            | StrataError::BucketNotFound { .. }
            | StrataError::TransactionNotActive { .. }
            | StrataError::TransactionReadOnly { .. }
            | StrataError::Io(_) => ErrorCode::Internal,
        }
    }

    /// True if this error means "no record at that key"
    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }

    /// True if the surrounding transaction was cancelled or timed out
    pub fn is_cancelled(&self) -> bool {
        self.code() == ErrorCode::Cancelled
    }

    /// Create an `InvalidInput` error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        StrataError::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a `NotFound` error
    pub fn not_found(message: impl Into<String>) -> Self {
        StrataError::NotFound {
            message: message.into(),
            source: None,
        }
    }

    /// Create a `Conflict` error
    pub fn conflict(message: impl Into<String>) -> Self {
        StrataError::Conflict {
            message: message.into(),
            source: None,
        }
    }

    /// Create an `Internal` error
    pub fn internal(message: impl Into<String>) -> Self {
        StrataError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create a `Storage` error
    pub fn storage(message: impl Into<String>) -> Self {
        StrataError::Storage {
            message: message.into(),
        }
    }

    /// Create a `Serialization` error
    pub fn serialization(message: impl Into<String>) -> Self {
        StrataError::Serialization {
            message: message.into(),
        }
    }

    /// Re-classify `source` as `NotFound`, keeping it as the cause
    pub fn wrap_not_found(message: impl Into<String>, source: StrataError) -> Self {
        StrataError::NotFound {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Re-classify `source` as `Conflict`, keeping it as the cause
    pub fn wrap_conflict(message: impl Into<String>, source: StrataError) -> Self {
        StrataError::Conflict {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Re-classify `source` as `Internal`, keeping it as the cause
    pub fn wrap_internal(message: impl Into<String>, source: StrataError) -> Self {
        StrataError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Render key bytes for error messages
///
/// Keys are arbitrary bytes; most are UTF-8 in practice, so we show them
/// lossily rather than as a byte array.
pub fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
