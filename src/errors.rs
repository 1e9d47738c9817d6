// Error taxonomy for the feed pipeline
// Leaf modules return typed errors; the loader attaches line context on top

use thiserror::Error;

/// Errors raised at the graph store boundary.
///
/// Anything that is about the store itself (unreachable, rejected a
/// statement, answered garbage) lands here, never data-content errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the call did not complete
    #[error("store transport failure: {0}")]
    Transport(String),

    /// The store answered but refused the statement
    #[error("store rejected statement: {0}")]
    Rejected(String),

    /// The store answered something we could not interpret
    #[error("malformed store response: {0}")]
    MalformedResponse(String),
}

/// Errors raised while transforming ledger records into graph entities.
#[derive(Debug, Error)]
pub enum FeedError {
    /// A required field failed coercion (non-numeric year, bad date, ...)
    #[error("field '{field}' has malformed value '{value}': {reason}")]
    MalformedField {
        field: String,
        value: String,
        reason: String,
    },

    /// A key template references a field absent from the record
    #[error("record is missing field '{field}'")]
    MissingField { field: String },

    /// A natural key has no matching vertex in the store
    #[error("key '{key}' does not resolve to any vertex")]
    UnresolvedKey { key: String },

    /// The store failed for reasons unrelated to data content
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FeedError {
    pub fn malformed(field: &str, value: &str, reason: &str) -> Self {
        FeedError::MalformedField {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn missing(field: &str) -> Self {
        FeedError::MissingField {
            field: field.to_string(),
        }
    }
}
