use ckpt_diff::ChangeKind;
use ckpt_store::Commit;
use ckpt_types::ObjectId;
use serde::Serialize;

/// One commit as reported by `log` and `show`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub id: ObjectId,
    pub parent: Option<ObjectId>,
    pub tree: ObjectId,
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl CommitSummary {
    pub fn new(id: ObjectId, commit: Commit) -> Self {
        Self {
            id,
            parent: commit.parent,
            tree: commit.tree,
            message: commit.message,
            timestamp_ms: commit.timestamp_ms,
        }
    }
}

/// A path that differs between HEAD and the live workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStatus {
    pub path: String,
    pub kind: ChangeKind,
}
