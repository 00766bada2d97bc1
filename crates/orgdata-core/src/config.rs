//! Data source configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration of a local-file data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSourceConfig {
    /// Path of the JSON document
    pub path: PathBuf,
    /// Seconds between modification-time checks while watching
    pub poll_interval_secs: u64,
}

impl FileSourceConfig {
    /// Create configuration for a path with the default poll interval
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// With path
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// With poll interval in seconds
    #[inline]
    #[must_use]
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Poll interval as a duration
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Check that the configuration is usable
    ///
    /// # Errors
    /// - [`ConfigError::MissingParameter`] if the path is empty
    /// - [`ConfigError::InvalidValue`] if the poll interval is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingParameter("path"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid_value(
                "poll_interval_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for FileSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            poll_interval_secs: 30,
        }
    }
}
