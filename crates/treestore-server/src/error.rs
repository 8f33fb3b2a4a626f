//! Error types for the service layer
//!
//! Ingestion errors never leave the bootstrap: they are logged and the
//! failing source contributes zero records. Configuration and bind errors
//! stop the binary before it serves anything.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Service error types with detailed context
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Seed file missing, unreadable, or not a JSON array
    #[error("seed file {} unusable: {reason}", path.display())]
    Seed {
        /// Path of the seed file
        path: PathBuf,
        /// Human-readable description
        reason: String,
    },

    /// Remote dataset request or response failed
    #[error("remote dataset {url} unavailable: {reason}")]
    Remote {
        /// Request URL without query string
        url: String,
        /// Human-readable description
        reason: String,
    },

    /// Configuration rejected by `Config::validate`
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP listener could not be bound
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// Requested listen address
        addr: String,
        /// Human-readable description
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
