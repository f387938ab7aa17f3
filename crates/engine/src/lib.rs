//! Database engine for Strata
//!
//! This crate orchestrates all lower layers:
//! - Database: in-memory database with closure and manual transaction APIs
//! - Transaction coordination and metrics
//! - Configuration (`strata.toml`)
//! - Logging setup
//!
//! The engine is the only component that knows about:
//! - Cross-layer coordination (storage + concurrency)
//! - Configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod database;
pub mod logging;

pub use coordinator::{TransactionCoordinator, TransactionMetrics, TxnOptions};
pub use database::{Database, LoggingConfig, StrataConfig, CONFIG_FILE_NAME};
pub use logging::init_logging;
