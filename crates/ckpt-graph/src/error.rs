//! Error types for the commit graph.

use ckpt_types::ObjectId;

/// Errors that can occur during commit graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The id does not name a commit in this store.
    #[error("commit not found: {0}")]
    NotFound(ObjectId),

    /// A commit names a parent that is missing from the store.
    #[error("commit {commit} references missing parent {parent}")]
    DanglingParent { commit: ObjectId, parent: ObjectId },

    /// Walking parents revisited a commit.
    #[error("cycle detected at commit {0}")]
    CycleDetected(ObjectId),

    /// Object store failure.
    #[error("store error: {0}")]
    Store(#[from] ckpt_store::StoreError),

    /// HEAD could not be read or moved.
    #[error("ref error: {0}")]
    Ref(#[from] ckpt_refs::RefError),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
