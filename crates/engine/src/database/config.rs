//! Database configuration via `strata.toml`
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Invalid values are rejected when the file is loaded, not when they are
//! first used.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use strata_core::{StrataError, StrataResult};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Log levels accepted by `[logging] level` and per-target overrides
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Logging configuration, persisted under the `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Base log level (default: "info")
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit an event when each span closes, with its elapsed time
    #[serde(default)]
    pub span_events: bool,
    /// Per-target level overrides, e.g. `"strata::kv" = "debug"`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, String>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            span_events: false,
            targets: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Check that every configured level is one of [`LOG_LEVELS`]
    pub fn validate(&self) -> StrataResult<()> {
        check_level("logging.level", &self.level)?;
        for (target, level) in &self.targets {
            check_level(&format!("logging.targets.{}", target), level)?;
        }
        Ok(())
    }
}

fn check_level(field: &str, level: &str) -> StrataResult<()> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(StrataError::invalid_input(format!(
            "Invalid log level '{}' for {}. Expected one of: {}",
            level,
            field,
            LOG_LEVELS.join(", ")
        )))
    }
}

/// Database configuration loaded from `strata.toml`.
///
/// # Example
///
/// ```toml
/// # 0 = no limit
/// transaction_timeout_ms = 5000
/// read_only = false
///
/// [logging]
/// level = "info"
/// span_events = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StrataConfig {
    /// Maximum lifetime of a transaction in milliseconds (0 = unlimited)
    #[serde(default)]
    pub transaction_timeout_ms: u64,
    /// Open every transaction read-only
    #[serde(default)]
    pub read_only: bool,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StrataConfig {
    /// Transaction timeout, or `None` when unlimited
    pub fn transaction_timeout(&self) -> Option<Duration> {
        match self.transaction_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Validate all fields
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the offending field.
    pub fn validate(&self) -> StrataResult<()> {
        self.logging.validate()
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Strata database configuration
#
# Maximum lifetime of a transaction in milliseconds.
# Operations on an older transaction fail with a timeout error.
# 0 = unlimited (default)
transaction_timeout_ms = 0

# Open every transaction read-only (default: false)
read_only = false

[logging]
# One of: trace, debug, info, warn, error, off
level = "info"
# Log elapsed time when each span (store operation) closes
span_events = false

# Per-target overrides
# [logging.targets]
# "strata::kv" = "debug"
# "strata::txn" = "warn"
"#
    }

    /// Parse and validate config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the text is not valid TOML for this
    /// structure or a value is out of range.
    pub fn from_toml_str(content: &str) -> StrataResult<Self> {
        let config: StrataConfig = toml::from_str(content).map_err(|e| {
            StrataError::invalid_input(format!("Failed to parse config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> StrataResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StrataError::internal(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            StrataError::InvalidInput { message } => StrataError::invalid_input(format!(
                "{} (in '{}')",
                message,
                path.display()
            )),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> StrataResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                StrataError::internal(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> StrataResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StrataError::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            StrataError::internal(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
