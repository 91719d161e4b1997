//! Error types for HEAD operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or moving HEAD.
#[derive(Debug, Error)]
pub enum RefError {
    /// The HEAD file exists but does not hold a valid commit id.
    #[error("corrupt HEAD at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// An in-process lock was poisoned.
    #[error("HEAD lock poisoned: {0}")]
    Poisoned(String),

    /// I/O error during file-based HEAD operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for HEAD operations.
pub type Result<T> = std::result::Result<T, RefError>;
