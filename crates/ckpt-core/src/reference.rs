use ckpt_types::ObjectId;

use crate::error::{CheckpointError, CheckpointResult};

/// Anything that names a commit: a parsed [`ObjectId`] or its hex form.
pub trait IntoCommitId {
    fn into_commit_id(self) -> CheckpointResult<ObjectId>;
}

/// Parse a 64-character hex commit id.
pub fn parse_commit_id(reference: &str) -> CheckpointResult<ObjectId> {
    ObjectId::from_hex(reference).map_err(|e| CheckpointError::InvalidReference {
        reference: reference.to_string(),
        reason: e.to_string(),
    })
}

impl IntoCommitId for ObjectId {
    fn into_commit_id(self) -> CheckpointResult<ObjectId> {
        Ok(self)
    }
}

impl IntoCommitId for &ObjectId {
    fn into_commit_id(self) -> CheckpointResult<ObjectId> {
        Ok(*self)
    }
}

impl IntoCommitId for &str {
    fn into_commit_id(self) -> CheckpointResult<ObjectId> {
        parse_commit_id(self)
    }
}

impl IntoCommitId for String {
    fn into_commit_id(self) -> CheckpointResult<ObjectId> {
        parse_commit_id(&self)
    }
}

impl IntoCommitId for &String {
    fn into_commit_id(self) -> CheckpointResult<ObjectId> {
        parse_commit_id(self)
    }
}
