//! Engine configuration.
//!
//! Built explicitly or from the environment. The CLI layers its flags on
//! top of whatever the environment provides.

use std::path::PathBuf;

use castle_core::UserId;

/// Default location of the persisted document.
pub const DEFAULT_DATA_FILE: &str = "data.json";

/// Where state lives and who the operator is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Path of the JSON document.
    pub data_file: PathBuf,
    /// The single privileged identity allowed to credit accounts.
    pub operator_id: UserId,
}

impl EngineConfig {
    pub fn new(data_file: impl Into<PathBuf>, operator_id: UserId) -> Self {
        Self {
            data_file: data_file.into(),
            operator_id,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CASTLE_DATA_FILE` (default: `data.json`)
    /// - `CASTLE_OPERATOR_ID` (required, integer user id)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_file = lookup("CASTLE_DATA_FILE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string());
        let raw_operator = lookup("CASTLE_OPERATOR_ID").ok_or(ConfigError::MissingOperator)?;
        let operator_id = raw_operator
            .parse()
            .map_err(|_| ConfigError::InvalidOperator(raw_operator.clone()))?;
        Ok(Self {
            data_file: PathBuf::from(data_file),
            operator_id,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CASTLE_OPERATOR_ID environment variable is required")]
    MissingOperator,
    #[error("invalid operator id {0:?}: expected an integer user id")]
    InvalidOperator(String),
}
