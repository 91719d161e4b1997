//! The commit graph: an append-only, strictly linear chain of commits
//! rooted at HEAD.
//!
//! # Invariants
//!
//! - Every commit except the first has exactly one parent.
//! - A new commit's parent is the HEAD at the time it was appended.
//! - HEAD is written last, after the commit object is durable.

use std::collections::HashSet;
use std::sync::Arc;

use ckpt_refs::HeadStore;
use ckpt_store::{Commit, ObjectKind, ObjectStore};
use ckpt_types::ObjectId;
use tracing::debug;

use crate::error::{GraphError, GraphResult};

/// Linear commit history over an object store and a HEAD pointer.
#[derive(Clone)]
pub struct CommitGraph {
    objects: Arc<dyn ObjectStore>,
    head: Arc<dyn HeadStore>,
}

impl std::fmt::Debug for CommitGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitGraph").finish_non_exhaustive()
    }
}

impl CommitGraph {
    pub fn new(objects: Arc<dyn ObjectStore>, head: Arc<dyn HeadStore>) -> Self {
        Self { objects, head }
    }

    /// The object store commits are read from and written to.
    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    /// Current HEAD, or `None` before the first commit.
    pub fn head(&self) -> GraphResult<Option<ObjectId>> {
        Ok(self.head.head()?)
    }

    /// Read a commit, reporting [`GraphError::NotFound`] when `id` is absent
    /// or names something other than a commit.
    pub fn read_commit(&self, id: &ObjectId) -> GraphResult<Commit> {
        let object = self
            .objects
            .read(id)?
            .filter(|o| o.kind == ObjectKind::Commit)
            .ok_or(GraphError::NotFound(*id))?;
        Ok(Commit::from_stored_object(&object)?)
    }

    /// Create a commit of `tree` on top of HEAD and advance HEAD to it.
    pub fn append(&self, tree: ObjectId, message: impl Into<String>) -> GraphResult<ObjectId> {
        let parent = self.head()?;
        let commit = Commit::new(tree, parent, message);
        let id = self.objects.write_commit(&commit)?;
        self.head.set_head(&id)?;
        debug!(
            commit = %id.short_hex(),
            parent = ?parent.map(|p| p.short_hex()),
            "appended commit"
        );
        Ok(id)
    }

    /// Point HEAD at an existing commit.
    pub fn move_head(&self, id: &ObjectId) -> GraphResult<Commit> {
        let commit = self.read_commit(id)?;
        self.head.set_head(id)?;
        debug!(commit = %id.short_hex(), "moved HEAD");
        Ok(commit)
    }

    /// Walk from `from` through parents, newest first.
    pub fn walk(&self, from: Option<ObjectId>) -> Ancestry<'_> {
        Ancestry {
            graph: self,
            next: from,
            child: None,
            seen: HashSet::new(),
        }
    }

    /// Ids from `from` back to the first commit, newest first.
    pub fn ancestry(&self, from: Option<ObjectId>) -> GraphResult<Vec<ObjectId>> {
        self.walk(from).map(|r| r.map(|(id, _)| id)).collect()
    }
}

/// Iterator over a commit chain, yielding `(id, commit)` pairs newest first.
///
/// Stops after the first error.
pub struct Ancestry<'a> {
    graph: &'a CommitGraph,
    next: Option<ObjectId>,
    child: Option<ObjectId>,
    seen: HashSet<ObjectId>,
}

impl Iterator for Ancestry<'_> {
    type Item = GraphResult<(ObjectId, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        if !self.seen.insert(id) {
            return Some(Err(GraphError::CycleDetected(id)));
        }
        let commit = match self.graph.read_commit(&id) {
            Ok(commit) => commit,
            Err(GraphError::NotFound(missing)) if self.child.is_some() => {
                return Some(Err(GraphError::DanglingParent {
                    commit: self.child.unwrap_or(missing),
                    parent: missing,
                }));
            }
            Err(e) => return Some(Err(e)),
        };
        self.child = Some(id);
        self.next = commit.parent;
        Some(Ok((id, commit)))
    }
}
