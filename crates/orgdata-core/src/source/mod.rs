//! Data sources for the directory document
//!
//! The [`DataSource`] trait separates where bytes come from from how they are
//! served:
//!
//! - **Testing**: scripted in-memory sources from `orgdata-test-utils`
//! - **Local deployments**: [`FileDataSource`] polling a file on disk
//! - **Remote backends**: object stores or config services implement the same
//!   two calls
//!
//! A source only produces bytes and change signals. Parsing, validation and
//! swapping live in the service.

mod file;

pub use file::FileDataSource;

use crate::error::{LoadError, OrgDataError};
use async_trait::async_trait;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Callback invoked by [`DataSource::watch`] after each detected change
#[async_trait]
pub trait OnChange: Send + Sync {
    /// React to a change in the source
    ///
    /// An error here is reported by the caller and does not end the watch.
    async fn changed(&self) -> Result<(), OrgDataError>;
}

/// Provider of raw directory documents
///
/// `Display` renders a human-readable identifier such as `file:///data/org.json`
/// that appears in logs and error messages.
#[async_trait]
pub trait DataSource: Send + Sync + fmt::Display {
    /// Fetch the current document bytes
    ///
    /// # Errors
    /// Returns [`LoadError`] if the backend cannot produce the document.
    async fn load(&self) -> Result<Vec<u8>, LoadError>;

    /// Watch for changes until `cancel` fires
    ///
    /// Calls `on_change` once per detected change. Returns `Ok(())` when
    /// cancelled.
    ///
    /// # Errors
    /// Returns [`LoadError::Watch`] if watching cannot continue.
    async fn watch(&self, cancel: CancellationToken, on_change: &dyn OnChange)
        -> Result<(), LoadError>;

    /// Human-readable identifier of this source
    fn describe(&self) -> String {
        self.to_string()
    }
}
