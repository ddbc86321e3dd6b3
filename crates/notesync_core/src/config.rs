//! Runtime configuration for the sync layer.
//!
//! # Responsibility
//! - Hold endpoint, timeout and logging settings in one serde-friendly shape.
//! - Overlay `NOTESYNC_*` environment variables and JSON files on defaults.
//!
//! # Invariants
//! - A validated config has an http(s) endpoint without trailing `/`.
//! - `request_timeout_ms` is never zero.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/notes";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

const ENV_ENDPOINT: &str = "NOTESYNC_ENDPOINT";
const ENV_TIMEOUT_MS: &str = "NOTESYNC_TIMEOUT_MS";
const ENV_LOG_LEVEL: &str = "NOTESYNC_LOG_LEVEL";
const ENV_LOG_DIR: &str = "NOTESYNC_LOG_DIR";

/// Configuration loading/validation error.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// Config file is not valid JSON for `SyncConfig`.
    Parse { path: PathBuf, message: String },
    /// One field holds an unusable value.
    Invalid { field: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid config `{}`: {message}", path.display())
            }
            Self::Invalid { field, message } => write!(f, "invalid `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Sync layer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote collection URL, e.g. `http://localhost:5000/api/notes`.
    pub endpoint: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Rolling log directory. Logs go to stderr when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl SyncConfig {
    /// Defaults overlaid with `NOTESYNC_*` process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Loads a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        config.validate()
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// Blank values are ignored so an exported-but-empty variable does not
    /// wipe a default.
    pub fn overlay_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(endpoint) = read(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(timeout) = read(ENV_TIMEOUT_MS) {
            self.request_timeout_ms =
                timeout.parse().map_err(|_| ConfigError::Invalid {
                    field: "request_timeout_ms",
                    message: format!("`{timeout}` is not a number of milliseconds"),
                })?;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }

        self.validate()
    }

    /// Normalizes and checks every field.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let endpoint = self.endpoint.trim().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "endpoint",
                message: format!("`{endpoint}` must start with http:// or https://"),
            });
        }
        self.endpoint = endpoint;

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }

        self.log_level = normalize_level(&self.log_level)
            .map_err(|err| ConfigError::Invalid {
                field: "log_level",
                message: err.to_string(),
            })?
            .to_string();

        Ok(self)
    }
}
