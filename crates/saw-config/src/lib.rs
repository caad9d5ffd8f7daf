// saw-config/src/lib.rs
// ============================================================================
// Module: SAW Configuration
// Description: Configuration loading and validation for the SAW runtime.
// Purpose: Strict, fail-closed TOML config parsing scoped to the knobs this
//          substrate actually has: storage, SQLite durability, the default
//          policy bundle location, log verbosity, and the run wall-clock cap.
// Dependencies: saw-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file. A missing or invalid file fails
//! closed rather than silently falling back to defaults for every field:
//! every field has a `#[serde(default)]`, but the file itself must parse.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Maximum configuration file size accepted, guarding against a misdirected
/// path pointing at something enormous.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The file's contents could not be parsed as TOML.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The parsed configuration failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `SQLite` durability pragmas the store should apply.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `PRAGMA synchronous = FULL`.
    Full,
    /// `PRAGMA synchronous = NORMAL`.
    Normal,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::Normal
    }
}

/// Storage configuration: where the ledger/run/LLM-invocation database lives
/// and how durably it is written.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the `SQLite` database file. `:memory:` is accepted for tests.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Synchronous pragma applied to the connection.
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { db_path: default_db_path(), sync_mode: SyncMode::default() }
    }
}

fn default_db_path() -> String {
    "saw_runs.db".to_string()
}

/// Policy configuration: where the default policy bundle is loaded from.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PolicyConfig {
    /// Path to a JSON file holding a `saw_core::PolicyBundle`. `None` means
    /// the caller supplies the bundle programmatically.
    #[serde(default)]
    pub bundle_path: Option<String>,
}

/// Logging verbosity, mapped onto a `tracing_subscriber::EnvFilter` directive.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages and above.
    Info,
    /// Debug-level detail.
    Debug,
    /// Maximum verbosity.
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    /// Returns the `tracing_subscriber::EnvFilter` directive string for this level.
    #[must_use]
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Runtime configuration: the run wall-clock cap and logging verbosity.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Logging verbosity.
    #[serde(default)]
    pub log_level: LogLevel,
    /// Maximum wall-clock duration a single run may take, in milliseconds.
    /// `None` preserves the uncapped contract.
    #[serde(default)]
    pub run_timeout_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { log_level: LogLevel::default(), run_timeout_ms: None }
    }
}

/// Root configuration for the SAW runtime.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SawConfig {
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Policy configuration.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Runtime configuration.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl SawConfig {
    /// Loads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, exceeds the size
    /// limit, cannot be parsed as TOML, or fails validation.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content =
            std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a field's value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.db_path.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.db_path must be non-empty".to_string()));
        }
        if let Some(timeout) = self.runtime.run_timeout_ms {
            if timeout == 0 {
                return Err(ConfigError::Invalid("runtime.run_timeout_ms must be greater than zero".to_string()));
            }
        }
        Ok(())
    }
}
