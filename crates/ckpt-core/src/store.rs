//! Checkpoint store: one workspace bound to its backing object store.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use ckpt_diff::{diff_snapshots, diff_trees, render_patch, FileVersion};
use ckpt_graph::CommitGraph;
use ckpt_refs::FileHeadStore;
use ckpt_store::{LooseObjectStore, ObjectStore};
use ckpt_types::ObjectId;
use ckpt_worktree::{
    build_tree, flatten_tree, lookup_path, normalize_path, Checkout, IgnorePolicy, Scanner,
    Snapshot, SnapshotEntry,
};
use tracing::{debug, info};

use crate::error::{CheckpointError, CheckpointResult};
use crate::layout::{StoreLayout, WorkspaceRecord};
use crate::reference::{parse_commit_id, IntoCommitId};
use crate::summary::{CommitSummary, FileStatus};

/// Handle to the checkpoint history of one workspace.
///
/// Cloning is cheap; clones share the same underlying store and lock, so
/// operations through any clone are serialized against each other.
#[derive(Clone)]
pub struct CheckpointStore {
    inner: Arc<Inner>,
}

struct Inner {
    workspace: PathBuf,
    layout: StoreLayout,
    objects: Arc<LooseObjectStore>,
    graph: CommitGraph,
    scanner: Scanner,
    checkout: Checkout,
    lock: Mutex<()>,
}

impl fmt::Debug for CheckpointStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckpointStore")
            .field("workspace", &self.inner.workspace)
            .field("store", &self.inner.layout.dir())
            .finish()
    }
}

impl CheckpointStore {
    /// Open the store at `store_dir` for `workspace`, creating it if needed.
    ///
    /// `workspace` should be absolute. A store directory already recorded
    /// for a different workspace is refused.
    pub fn open(
        workspace: impl Into<PathBuf>,
        store_dir: impl Into<PathBuf>,
        policy: IgnorePolicy,
    ) -> CheckpointResult<Self> {
        let workspace = workspace.into();
        let layout = StoreLayout::new(store_dir);

        match WorkspaceRecord::load(&layout)? {
            Some(record) if record.workspace != workspace => {
                return Err(CheckpointError::StoreUnavailable(format!(
                    "{} belongs to workspace {}",
                    layout.dir().display(),
                    record.workspace.display()
                )));
            }
            Some(_) => {
                debug!(workspace = ?workspace, store = ?layout.dir(), "opened checkpoint store");
            }
            None => {
                WorkspaceRecord::new(&workspace).save(&layout)?;
                info!(workspace = ?workspace, store = ?layout.dir(), "created checkpoint store");
            }
        }

        let objects = Arc::new(LooseObjectStore::open(layout.objects_dir())?);
        let head = Arc::new(FileHeadStore::new(layout.head_file()));
        let graph = CommitGraph::new(objects.clone(), head);
        let scanner = Scanner::new(&workspace, policy)?;
        let checkout = Checkout::new(&workspace);

        Ok(Self {
            inner: Arc::new(Inner {
                workspace,
                layout,
                objects,
                graph,
                scanner,
                checkout,
                lock: Mutex::new(()),
            }),
        })
    }

    /// The workspace directory this store snapshots.
    pub fn workspace(&self) -> &Path {
        &self.inner.workspace
    }

    /// The backing store directory.
    pub fn store_dir(&self) -> &Path {
        self.inner.layout.dir()
    }

    /// Snapshot the workspace.
    ///
    /// Creates a commit on top of HEAD only when the tree differs from HEAD's
    /// tree; otherwise returns HEAD unchanged.
    pub fn save(&self, message: Option<&str>) -> CheckpointResult<ObjectId> {
        let _guard = self.lock()?;
        let objects = self.objects();

        let snapshot = self.inner.scanner.capture(objects)?;
        let tree = build_tree(objects, &snapshot)?;

        if let Some(head) = self.inner.graph.head()? {
            let current = self.inner.graph.read_commit(&head)?;
            if current.tree == tree {
                debug!(head = %head.short_hex(), "no changes, returning HEAD");
                return Ok(head);
            }
        }

        let id = self.inner.graph.append(tree, message.unwrap_or_default())?;
        info!(
            commit = %id.short_hex(),
            files = snapshot.len(),
            workspace = ?self.inner.workspace,
            "saved checkpoint"
        );
        Ok(id)
    }

    /// The current HEAD commit.
    pub fn head(&self) -> CheckpointResult<ObjectId> {
        let _guard = self.lock()?;
        self.require_head()
    }

    /// All commits reachable from HEAD, newest first. Empty before the
    /// first save.
    pub fn commits(&self) -> CheckpointResult<Vec<ObjectId>> {
        let _guard = self.lock()?;
        let head = self.inner.graph.head()?;
        Ok(self.inner.graph.ancestry(head)?)
    }

    /// Up to `limit` commits from HEAD, newest first.
    pub fn log(&self, limit: Option<usize>) -> CheckpointResult<Vec<CommitSummary>> {
        let _guard = self.lock()?;
        let head = self.inner.graph.head()?;
        self.inner
            .graph
            .walk(head)
            .take(limit.unwrap_or(usize::MAX))
            .map(|r| r.map(|(id, commit)| CommitSummary::new(id, commit)).map_err(Into::into))
            .collect()
    }

    /// Summary of one stored commit, reachable from HEAD or not.
    pub fn show(&self, commit: impl IntoCommitId) -> CheckpointResult<CommitSummary> {
        let id = commit.into_commit_id()?;
        let _guard = self.lock()?;
        let commit = self.inner.graph.read_commit(&id)?;
        Ok(CommitSummary::new(id, commit))
    }

    /// Make the workspace match `commit` exactly and move HEAD to it.
    ///
    /// Files the commit does not contain are deleted, everything else is
    /// restored. Ignored paths are left alone. Commits newer than `commit`
    /// stay in the store and remain addressable by id.
    pub fn reset(&self, commit: impl IntoCommitId) -> CheckpointResult<()> {
        let id = commit.into_commit_id()?;
        let _guard = self.lock()?;
        let objects = self.objects();

        let target_commit = self.inner.graph.read_commit(&id)?;
        let target = flatten_tree(objects, &target_commit.tree)?;
        let current = self.inner.scanner.inspect()?;
        let report = self.inner.checkout.apply(objects, &target, &current)?;
        self.inner.graph.move_head(&id)?;

        info!(
            commit = %id.short_hex(),
            written = report.written.len(),
            deleted = report.deleted.len(),
            "reset workspace"
        );
        Ok(())
    }

    /// Restore a single file from `commit`. HEAD and all other files are
    /// left untouched.
    pub fn rollback(&self, commit: impl IntoCommitId, path: impl AsRef<Path>) -> CheckpointResult<()> {
        let id = commit.into_commit_id()?;
        let key = normalize_path(&self.inner.workspace, path.as_ref())?;
        let _guard = self.lock()?;
        let objects = self.objects();

        let commit = self.inner.graph.read_commit(&id)?;
        let entry = lookup_path(objects, &commit.tree, &key)?.ok_or_else(|| {
            CheckpointError::NotFound(format!("{key} in commit {}", id.short_hex()))
        })?;
        self.inner.checkout.restore(objects, &key, &entry)?;

        info!(commit = %id.short_hex(), path = %key, "rolled back file");
        Ok(())
    }

    /// Unified diff of `path` between `commit`'s parent and `commit`.
    ///
    /// A root commit is compared against an empty tree. Returns an empty
    /// string when the file is unchanged.
    pub fn get_file_diff(
        &self,
        commit: impl IntoCommitId,
        path: impl AsRef<Path>,
    ) -> CheckpointResult<String> {
        let id = commit.into_commit_id()?;
        let key = normalize_path(&self.inner.workspace, path.as_ref())?;
        let _guard = self.lock()?;
        let objects = self.objects();

        let commit = self.inner.graph.read_commit(&id)?;
        let new = lookup_path(objects, &commit.tree, &key)?;
        let old = match commit.parent {
            Some(parent) => {
                let parent = self.inner.graph.read_commit(&parent)?;
                lookup_path(objects, &parent.tree, &key)?
            }
            None => None,
        };
        if old.is_none() && new.is_none() {
            return Err(CheckpointError::NotFound(format!(
                "{key} in commit {} or its parent",
                id.short_hex()
            )));
        }

        let old_content = self.read_content(old.as_ref())?;
        let new_content = self.read_content(new.as_ref())?;
        Ok(render_patch(
            &key,
            old.zip(old_content.as_deref())
                .map(|(e, c)| FileVersion::new(e.mode, c)),
            new.zip(new_content.as_deref())
                .map(|(e, c)| FileVersion::new(e.mode, c)),
        ))
    }

    /// Paths changed by `commit` (HEAD when `None`) relative to its parent.
    pub fn get_changed_files(&self, commit: Option<&str>) -> CheckpointResult<Vec<String>> {
        let id = match commit {
            Some(reference) => parse_commit_id(reference)?,
            None => self.head()?,
        };
        self.changed_files(id)
    }

    /// Paths changed by `commit` relative to its parent, sorted.
    ///
    /// Additions, deletions, content changes and mode changes all count.
    pub fn changed_files(&self, commit: impl IntoCommitId) -> CheckpointResult<Vec<String>> {
        let id = commit.into_commit_id()?;
        let _guard = self.lock()?;

        let commit = self.inner.graph.read_commit(&id)?;
        let parent_tree = match commit.parent {
            Some(parent) => Some(self.inner.graph.read_commit(&parent)?.tree),
            None => None,
        };
        let diff = diff_trees(self.objects(), parent_tree.as_ref(), Some(&commit.tree))?;
        Ok(diff.paths())
    }

    /// Uncommitted changes in the workspace relative to HEAD.
    ///
    /// Nothing is written to the store.
    pub fn status(&self) -> CheckpointResult<Vec<FileStatus>> {
        let _guard = self.lock()?;
        let base = match self.inner.graph.head()? {
            Some(head) => {
                let commit = self.inner.graph.read_commit(&head)?;
                flatten_tree(self.objects(), &commit.tree)?
            }
            None => Snapshot::new(),
        };
        let live = self.inner.scanner.inspect()?;
        Ok(diff_snapshots(&base, &live)
            .changes
            .iter()
            .map(|c| FileStatus {
                path: c.path().to_string(),
                kind: c.kind(),
            })
            .collect())
    }

    fn objects(&self) -> &LooseObjectStore {
        &self.inner.objects
    }

    fn require_head(&self) -> CheckpointResult<ObjectId> {
        self.inner
            .graph
            .head()?
            .ok_or_else(|| CheckpointError::NotFound("HEAD (nothing saved yet)".to_string()))
    }

    fn read_content(&self, entry: Option<&SnapshotEntry>) -> CheckpointResult<Option<Vec<u8>>> {
        entry
            .map(|e| self.objects().read_blob(&e.id).map(|b| b.data))
            .transpose()
            .map_err(Into::into)
    }

    fn lock(&self) -> CheckpointResult<MutexGuard<'_, ()>> {
        self.inner
            .lock
            .lock()
            .map_err(|_| CheckpointError::StoreUnavailable("store lock poisoned".to_string()))
    }
}
