//! Application configuration module
//!
//! Tunables for the offline queue: backend location, HTTP timeout, retry
//! ceiling, drain cadence and local storage limits. Values can be built in
//! code with [`AppConfigBuilder`] or loaded from a TOML file.
//!
//! ```toml
//! server_url = "https://api.example.com"
//! request_timeout_ms = 10000
//! max_attempts = 8
//! drain_interval_secs = 30
//! storage_quota_bytes = 5242880
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 8;
const DEFAULT_DRAIN_INTERVAL_SECS: u64 = 30;
const DEFAULT_PROBE_PATH: &str = "/health";
const DEFAULT_PROBE_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_BACKOFF_BASE_SECS: u64 = 5;
const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend base URL
    pub server_url: Option<String>,
    /// Bound on every HTTP attempt
    pub request_timeout_ms: u64,
    /// Attempts before a retryable action is dead-lettered
    pub max_attempts: u32,
    /// Safety-net drain period while online
    pub drain_interval_secs: u64,
    /// Byte budget for the serialized pending-action collection
    pub storage_quota_bytes: Option<usize>,
    /// Lightweight endpoint used to confirm reachability
    pub probe_path: String,
    /// Consecutive probe failures before the visible status flips to offline
    pub probe_failure_threshold: u32,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
    /// SQLite file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            drain_interval_secs: DEFAULT_DRAIN_INTERVAL_SECS,
            storage_quota_bytes: None,
            probe_path: DEFAULT_PROBE_PATH.to_string(),
            probe_failure_threshold: DEFAULT_PROBE_FAILURE_THRESHOLD,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            database_path: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be greater than zero",
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "must be at least 1",
            });
        }
        if self.drain_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "drain_interval_secs",
                reason: "must be greater than zero",
            });
        }
        if self.probe_failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probe_failure_threshold",
                reason: "must be at least 1",
            });
        }
        if self.backoff_base_secs > self.backoff_max_secs {
            return Err(ConfigError::InvalidValue {
                field: "backoff_base_secs",
                reason: "must not exceed backoff_max_secs",
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs)
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn drain_interval(mut self, interval: Duration) -> Self {
        self.config.drain_interval_secs = interval.as_secs();
        self
    }

    pub fn storage_quota_bytes(mut self, quota: usize) -> Self {
        self.config.storage_quota_bytes = Some(quota);
        self
    }

    pub fn probe_path(mut self, path: impl Into<String>) -> Self {
        self.config.probe_path = path.into();
        self
    }

    pub fn probe_failure_threshold(mut self, threshold: u32) -> Self {
        self.config.probe_failure_threshold = threshold;
        self
    }

    pub fn backoff(mut self, base_secs: u64, max_secs: u64) -> Self {
        self.config.backoff_base_secs = base_secs;
        self.config.backoff_max_secs = max_secs;
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
