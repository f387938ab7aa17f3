//! Core types and traits for Strata
//!
//! This crate defines the foundational types used throughout the system:
//! - BucketName / BucketKey: Addressing of records inside the engine
//! - ScanRange / Cursor: Ordered range scans over a bucket
//! - WriteBatch / VersionedValue: Commit-time write sets and versioned reads
//! - Error: Error type hierarchy with stable error codes
//! - Traits: Core trait definitions (Storage, SnapshotView, Tx)
//! - CancellationToken: Cooperative transaction cancellation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use cancel::CancellationToken;
pub use error::{display_key, ErrorCode, StrataError, StrataResult};
pub use traits::{SnapshotView, Storage, Tx};
pub use types::{BucketKey, BucketName, Cursor, KvPair, ScanRange, VersionedValue, WriteBatch};
