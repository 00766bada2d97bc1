//! Document loader and validator
//!
//! Turns raw bytes into a [`Snapshot`]. Pure: no logging, no shared state.
//!
//! ```text
//! bytes → decode (serde_json) → validate → Snapshot
//! ```
//!
//! A document that decodes but has no employees or no membership index is
//! rejected: accepting it would blank every query for every caller.

use crate::error::{LoadError, ValidationError};
use crate::snapshot::{Document, Snapshot};

/// Failure of [`load_snapshot`]
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Bytes are not a decodable document
    #[error(transparent)]
    Decode(#[from] LoadError),

    /// Document decoded but is unusable
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Decode and validate a document
///
/// `source_name` only labels decode errors.
///
/// # Errors
/// - [`ParseError::Decode`] if the bytes are not valid JSON of the expected shape
/// - [`ParseError::Invalid`] if required collections are empty
pub fn load_snapshot(source_name: &str, bytes: &[u8]) -> Result<Snapshot, ParseError> {
    let doc: Document =
        serde_json::from_slice(bytes).map_err(|e| LoadError::decode(source_name, e))?;
    Ok(validate(doc)?)
}

/// Validate an already decoded document
///
/// # Errors
/// Returns the first missing required collection.
pub(crate) fn validate(doc: Document) -> Result<Snapshot, ValidationError> {
    if doc.lookups.employees.is_empty() {
        return Err(ValidationError::MissingEmployees);
    }
    if doc.indexes.membership.membership_index.is_empty() {
        return Err(ValidationError::MissingMembershipIndex);
    }
    Ok(Snapshot::from_document(doc))
}

/// Decode and validate a document from an unnamed buffer
///
/// # Errors
/// See [`load_snapshot`].
pub fn parse(bytes: &[u8]) -> Result<Snapshot, ParseError> {
    load_snapshot("<bytes>", bytes)
}
