//! Local file data source

use super::{DataSource, OnChange};
use crate::config::FileSourceConfig;
use crate::error::{ConfigError, LoadError};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

/// Lower bound on the polling interval
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Data source reading a JSON document from the local filesystem
///
/// Changes are detected by polling the file's modification time. A file that
/// is temporarily missing is skipped until it reappears.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    path: PathBuf,
    poll_interval: Duration,
}

impl FileDataSource {
    /// Create a source from validated configuration
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn new(config: &FileSourceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            path: config.path.clone(),
            poll_interval: config.poll_interval(),
        })
    }

    /// Create a source for a path with the default poll interval
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingParameter`] if the path is empty.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::new(&FileSourceConfig::new(path))
    }

    /// With a sub-second poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Path being read
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Poll interval used by [`DataSource::watch`]
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn modified(&self) -> Option<SystemTime> {
        let meta = tokio::fs::metadata(&self.path).await.ok()?;
        meta.modified().ok()
    }
}

impl fmt::Display for FileDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file://{}", self.path.display())
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn load(&self) -> Result<Vec<u8>, LoadError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| LoadError::io_error(&self.path, e))
    }

    async fn watch(
        &self,
        cancel: CancellationToken,
        on_change: &dyn OnChange,
    ) -> Result<(), LoadError> {
        let mut last_modified = self.modified().await;
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(source = %self, "file watch cancelled");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let Some(current) = self.modified().await else {
                tracing::debug!(source = %self, "file not readable, skipping poll");
                continue;
            };
            if last_modified == Some(current) {
                continue;
            }
            last_modified = Some(current);

            tracing::debug!(source = %self, "file modification detected");
            if let Err(e) = on_change.changed().await {
                tracing::debug!(source = %self, error = %e, "change handler failed");
            }
        }
    }
}
