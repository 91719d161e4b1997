//! Error types for the diff crate.

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Store operation failed (missing or corrupt tree or blob).
    #[error("store error: {0}")]
    Store(#[from] ckpt_store::StoreError),

    /// A tree could not be interpreted as a working tree.
    #[error("worktree error: {0}")]
    Worktree(#[from] ckpt_worktree::WorktreeError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
