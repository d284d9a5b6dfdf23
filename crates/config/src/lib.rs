//! `tickrec-config` — TOML configuration for the reconciliation CLI.
//!
//! The original tool hardcoded its two published-CSV URLs in the code;
//! here they live in an explicit config value handed to the loader at
//! call time. No process-global state, no environment lookups.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub name: Option<String>,
    pub sources: Sources,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub fields: FieldsConfig,
}

#[derive(Debug, Deserialize)]
pub struct Sources {
    pub reported: SourceConfig,
    pub billable: SourceConfig,
}

/// Exactly one of `url` / `file` must be set; `validate` enforces it.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Extra column names excluded from the comparable set, appended to the
/// engine's built-in exclusion list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldsConfig {
    #[serde(default)]
    pub exclude: Vec<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// Semantic validation error.
    Validation(String),
    /// Config file read error.
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "cannot read config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl Config {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let input =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sources.reported.validate("sources.reported")?;
        self.sources.billable.validate("sources.billable")?;

        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl SourceConfig {
    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        match (&self.url, &self.file) {
            (Some(_), Some(_)) => Err(ConfigError::Validation(format!(
                "{section}: set either url or file, not both"
            ))),
            (None, None) => Err(ConfigError::Validation(format!(
                "{section}: one of url or file is required"
            ))),
            (Some(url), None) if !url.starts_with("http://") && !url.starts_with("https://") => {
                Err(ConfigError::Validation(format!(
                    "{section}: url must start with http:// or https://"
                )))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
