use std::path::PathBuf;

use ckpt_diff::DiffError;
use ckpt_graph::GraphError;
use ckpt_refs::RefError;
use ckpt_store::StoreError;
use ckpt_worktree::WorktreeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    /// No HEAD where one is required, an unknown commit, or a path missing
    /// from the referenced tree.
    #[error("not found: {0}")]
    NotFound(String),

    /// A commit id string that is not 64 hex characters.
    #[error("invalid commit reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    /// The backing store could not be read or written, or is corrupt.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The working tree could not be scanned.
    #[error("failed to scan {path}: {reason}")]
    ScanFailure { path: PathBuf, reason: String },

    /// A file path escapes the workspace or contains `..`.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Files in the workspace could not be updated.
    #[error("workspace update failed: {0}")]
    WorkspaceUpdate(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type CheckpointResult<T> = Result<T, CheckpointError>;

impl From<StoreError> for CheckpointError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(format!("object {id}")),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<RefError> for CheckpointError {
    fn from(e: RefError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<GraphError> for CheckpointError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::NotFound(id) => Self::NotFound(format!("commit {id}")),
            GraphError::Store(e) => e.into(),
            GraphError::Ref(e) => e.into(),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<WorktreeError> for CheckpointError {
    fn from(e: WorktreeError) -> Self {
        match e {
            WorktreeError::ScanFailure { path, reason } => Self::ScanFailure { path, reason },
            WorktreeError::InvalidPath { path, reason } => Self::InvalidPath { path, reason },
            WorktreeError::Pattern { .. } => Self::Config(e.to_string()),
            WorktreeError::Store(e) => e.into(),
            other => Self::WorkspaceUpdate(other.to_string()),
        }
    }
}

impl From<DiffError> for CheckpointError {
    fn from(e: DiffError) -> Self {
        match e {
            DiffError::Store(e) => e.into(),
            DiffError::Worktree(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckpt_types::ObjectId;

    #[test]
    fn missing_objects_map_to_not_found() {
        let id = ObjectId::from_bytes(b"x");
        let err: CheckpointError = StoreError::NotFound(id).into();
        assert!(matches!(err, CheckpointError::NotFound(_)));
        let err: CheckpointError = GraphError::Store(StoreError::NotFound(id)).into();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[test]
    fn corruption_maps_to_store_unavailable() {
        let id = ObjectId::from_bytes(b"x");
        let err: CheckpointError = StoreError::HashMismatch { id, computed: id }.into();
        assert!(matches!(err, CheckpointError::StoreUnavailable(_)));
        let err: CheckpointError = GraphError::CycleDetected(id).into();
        assert!(matches!(err, CheckpointError::StoreUnavailable(_)));
    }

    #[test]
    fn worktree_errors_keep_their_class() {
        let err: CheckpointError = WorktreeError::ScanFailure {
            path: "a".into(),
            reason: "denied".into(),
        }
        .into();
        assert!(matches!(err, CheckpointError::ScanFailure { .. }));

        let err: CheckpointError = WorktreeError::Obstructed("dir".into()).into();
        assert!(matches!(err, CheckpointError::WorkspaceUpdate(_)));
    }
}
