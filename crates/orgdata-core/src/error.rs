//! Error types for orgdata
//!
//! Provides error handling for:
//! - Data source fetch and decode failures
//! - Document validation failures
//! - Source configuration problems
//! - Watcher lifecycle conflicts
//!
//! Point and hierarchy queries never return these: absence is an empty or
//! `None` result. Only the `require_*` accessors surface [`OrgDataError::NotFound`].

use std::path::PathBuf;

/// Errors while fetching or decoding a document from a data source
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// IO error reading a local source
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON for the expected shape
    #[error("failed to parse JSON from {source_name}: {source}")]
    Decode {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend-specific fetch failure
    #[error("failed to load from {source_name}: {message}")]
    Source { source_name: String, message: String },

    /// Watch loop could not continue
    #[error("watch on {source_name} failed: {message}")]
    Watch { source_name: String, message: String },
}

impl LoadError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create decode error for a named source
    pub fn decode(source_name: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            source_name: source_name.into(),
            source,
        }
    }

    /// Create backend fetch error
    pub fn backend(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create watch failure
    pub fn watch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Watch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// A parseable document that is missing required content
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `lookups.employees` is absent or empty
    #[error("missing lookups.employees")]
    MissingEmployees,

    /// `indexes.membership.membership_index` is absent or empty
    #[error("missing indexes.membership.membership_index")]
    MissingMembershipIndex,
}

/// Invalid data source configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required parameter was not provided
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// A parameter is present but unusable
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    /// Config file could not be read or parsed
    #[error("failed to read config {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

impl ConfigError {
    /// Create invalid value error
    pub fn invalid_value(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name,
            reason: reason.into(),
        }
    }
}

/// Combined orgdata error
#[derive(Debug, thiserror::Error)]
pub enum OrgDataError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("invalid data from {source_name}: {error}")]
    Validation {
        source_name: String,
        #[source]
        error: ValidationError,
    },

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("data source watcher is already running")]
    AlreadyRunning,
}

impl OrgDataError {
    /// Create validation error attributed to a source
    pub fn validation(source_name: impl Into<String>, error: ValidationError) -> Self {
        Self::Validation {
            source_name: source_name.into(),
            error,
        }
    }

    /// Create not-found error
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Check if a later attempt could succeed without a code or config change
    ///
    /// Only source failures qualify. Rejected documents fail the same way
    /// until the upstream data changes.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Load(LoadError::Io { .. } | LoadError::Source { .. } | LoadError::Watch { .. })
        )
    }
}

/// Result type alias for orgdata operations
pub type OrgDataResult<T> = Result<T, OrgDataError>;
