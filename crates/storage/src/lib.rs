//! Storage layer for Strata
//!
//! This crate implements the committed storage backend with:
//! - UnifiedStore: bucketed BTreeMap storage with RwLock
//! - Version management with AtomicU64
//! - ClonedSnapshotView implementation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod snapshot;
pub mod unified;

pub use snapshot::ClonedSnapshotView;
pub use unified::UnifiedStore;
