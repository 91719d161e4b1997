//! Error types for the worktree crate.

use std::path::PathBuf;

/// Errors that can occur while scanning or materializing a working tree.
#[derive(Debug, thiserror::Error)]
pub enum WorktreeError {
    /// A file or directory could not be read during a scan.
    #[error("failed to scan {path}: {reason}")]
    ScanFailure { path: PathBuf, reason: String },

    /// A path escapes the workspace, contains `..`, or is otherwise unusable.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// An ignore pattern could not be compiled.
    #[error("invalid ignore pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    /// An untracked directory or file blocks a path from being written.
    #[error("cannot write {0}: an untracked path is in the way")]
    Obstructed(String),

    /// Writing or removing a file in the workspace failed.
    #[error("failed to update {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Object store operation failed.
    #[error("store error: {0}")]
    Store(#[from] ckpt_store::StoreError),
}

impl WorktreeError {
    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for worktree results.
pub type WorktreeResult<T> = Result<T, WorktreeError>;
