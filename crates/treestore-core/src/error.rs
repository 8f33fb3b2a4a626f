//! Error types for catalog operations
//!
//! Lookups that miss are not errors: the store returns `Option` for those.
//! `StoreError` covers the two caller mistakes the store can detect.

use thiserror::Error;

/// Catalog error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A create payload failed field validation.
    ///
    /// Holds one message per failing field, in field order.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Bulk deletion was asked for an origin class that does not exist
    #[error("invalid origin '{0}': expected one of all, dataset (api), user (manual)")]
    InvalidOrigin(String),
}

impl StoreError {
    /// Field messages for a validation failure, empty for other variants.
    pub fn messages(&self) -> &[String] {
        match self {
            StoreError::Validation(messages) => messages,
            StoreError::InvalidOrigin(_) => &[],
        }
    }
}

/// Result type alias for catalog operations
pub type StoreResult<T> = Result<T, StoreError>;
