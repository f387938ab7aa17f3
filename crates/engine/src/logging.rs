//! Logging setup powered by tracing-subscriber
//!
//! The library crates only emit `tracing` events and spans. Binaries, tests
//! and benches that want to see them call [`init_logging`] once.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use strata_core::{StrataError, StrataResult};

use crate::database::config::LoggingConfig;

/// Build the `EnvFilter` from the base level and per-target overrides
///
/// `RUST_LOG`, when set, takes precedence over the configured base level.
pub fn build_env_filter(config: &LoggingConfig) -> StrataResult<EnvFilter> {
    config.validate()?;

    let base = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| config.level.to_ascii_lowercase());

    let mut directives = vec![base];
    for (target, level) in &config.targets {
        directives.push(format!("{}={}", target, level.to_ascii_lowercase()));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str).map_err(|e| {
        StrataError::invalid_input(format!("Invalid tracing filter '{}': {}", filter_str, e))
    })
}

/// Initialize the global tracing subscriber
///
/// Returns `Ok(false)` if a global subscriber was already installed, so
/// tests can call this repeatedly.
///
/// # Errors
///
/// Returns `InvalidInput` if the configured levels do not form a valid filter.
pub fn init_logging(config: &LoggingConfig) -> StrataResult<bool> {
    let filter = build_env_filter(config)?;
    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_span_events(span_events)
        .try_init()
        .is_ok();
    Ok(installed)
}
