//! Environment-driven configuration.
//!
//! # Invariants
//! - Decomposition mode is decided once here, never per call.
//! - Malformed numeric values are errors, not silent defaults.

use crate::decompose::MAX_SUBTASKS;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "TASKDECK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKDECK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKDECK_LOG_DIR";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_LLM_ENDPOINT: &str = "TASKDECK_LLM_ENDPOINT";
pub const ENV_LLM_MODEL: &str = "TASKDECK_LLM_MODEL";
pub const ENV_LLM_TIMEOUT_SECS: &str = "TASKDECK_LLM_TIMEOUT_SECS";
pub const ENV_MAX_SUBTASKS: &str = "TASKDECK_MAX_SUBTASKS";

const DEFAULT_DB_FILE: &str = "taskdeck.sqlite3";
const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
/// API key placeholder that still selects mock mode.
const PLACEHOLDER_API_KEY: &str = "dummy";

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer, got `{value}`")
            }
            Self::OutOfRange {
                key,
                value,
                min,
                max,
            } => write!(f, "{key} must be within {min}..={max}, got {value}"),
        }
    }
}

impl Error for ConfigError {}

/// Settings for the decomposition client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompositionConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub max_subtasks: usize,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            max_subtasks: MAX_SUBTASKS,
        }
    }
}

impl DecompositionConfig {
    /// Returns the key to use for live calls, or `None` for mock mode.
    pub fn live_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }
}

/// Process-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute log directory; `None` disables file logging.
    pub log_dir: Option<String>,
    pub decomposition: DecompositionConfig,
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let timeout_secs = match get(ENV_LLM_TIMEOUT_SECS) {
            Some(value) => parse_bounded(ENV_LLM_TIMEOUT_SECS, &value, 1, 600)?,
            None => DEFAULT_LLM_TIMEOUT_SECS,
        };
        let max_subtasks = match get(ENV_MAX_SUBTASKS) {
            Some(value) => parse_bounded(ENV_MAX_SUBTASKS, &value, 1, MAX_SUBTASKS as u64)? as usize,
            None => MAX_SUBTASKS,
        };

        Ok(Self {
            db_path: get(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE)),
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: get(ENV_LOG_DIR),
            decomposition: DecompositionConfig {
                api_key: get(ENV_API_KEY),
                endpoint: get(ENV_LLM_ENDPOINT).unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string()),
                model: get(ENV_LLM_MODEL).unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
                max_subtasks,
            },
        })
    }
}

fn parse_bounded(key: &'static str, value: &str, min: u64, max: u64) -> Result<u64, ConfigError> {
    let parsed = value.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })?;
    if parsed < min || parsed > max {
        return Err(ConfigError::OutOfRange {
            key,
            value: parsed,
            min,
            max,
        });
    }
    Ok(parsed)
}
