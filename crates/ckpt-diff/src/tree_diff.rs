//! Tree-level diff: compare two trees and produce a list of changed paths.
//!
//! Trees are compared recursively by name. Subtrees whose ids match on both
//! sides are skipped without being read, so unchanged directories cost
//! nothing regardless of their size.

use std::collections::BTreeSet;
use std::fmt;

use ckpt_store::{EntryMode, ObjectStore, Tree, TreeEntry};
use ckpt_types::ObjectId;
use ckpt_worktree::Snapshot;

use crate::error::DiffResult;

/// The result of comparing two trees, sorted by path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeDiff {
    pub changes: Vec<TreeChange>,
}

impl TreeDiff {
    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Changed paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.changes.iter().map(|c| c.path().to_string()).collect()
    }
}

/// Classification of a [`TreeChange`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    ModeChanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Modified => "modified",
            Self::ModeChanged => "mode changed",
        })
    }
}

/// A single changed file between two trees.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeChange {
    /// A file present only in the new tree.
    Added {
        path: String,
        new_id: ObjectId,
        mode: EntryMode,
    },
    /// A file present only in the old tree.
    Deleted {
        path: String,
        old_id: ObjectId,
        mode: EntryMode,
    },
    /// Same path, different content.
    Modified {
        path: String,
        old_id: ObjectId,
        new_id: ObjectId,
        old_mode: EntryMode,
        new_mode: EntryMode,
    },
    /// Same path and content, different mode.
    ModeChanged {
        path: String,
        id: ObjectId,
        old_mode: EntryMode,
        new_mode: EntryMode,
    },
}

impl TreeChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. }
            | Self::Deleted { path, .. }
            | Self::Modified { path, .. }
            | Self::ModeChanged { path, .. } => path,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Added { .. } => ChangeKind::Added,
            Self::Deleted { .. } => ChangeKind::Deleted,
            Self::Modified { .. } => ChangeKind::Modified,
            Self::ModeChanged { .. } => ChangeKind::ModeChanged,
        }
    }

    fn between(
        path: String,
        old: Option<(EntryMode, ObjectId)>,
        new: Option<(EntryMode, ObjectId)>,
    ) -> Option<Self> {
        match (old, new) {
            (None, None) => None,
            (None, Some((mode, new_id))) => Some(Self::Added { path, new_id, mode }),
            (Some((mode, old_id)), None) => Some(Self::Deleted { path, old_id, mode }),
            (Some((old_mode, old_id)), Some((new_mode, new_id))) => {
                if old_id != new_id {
                    Some(Self::Modified {
                        path,
                        old_id,
                        new_id,
                        old_mode,
                        new_mode,
                    })
                } else if old_mode != new_mode {
                    Some(Self::ModeChanged {
                        path,
                        id: new_id,
                        old_mode,
                        new_mode,
                    })
                } else {
                    None
                }
            }
        }
    }
}

/// Compare two trees read from `store`.
///
/// `None` on either side stands for the empty tree.
pub fn diff_trees(
    store: &dyn ObjectStore,
    old_tree: Option<&ObjectId>,
    new_tree: Option<&ObjectId>,
) -> DiffResult<TreeDiff> {
    let mut changes = Vec::new();
    if old_tree != new_tree {
        walk(store, old_tree.copied(), new_tree.copied(), "", &mut changes)?;
    }
    changes.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(TreeDiff { changes })
}

fn load(store: &dyn ObjectStore, id: Option<ObjectId>) -> DiffResult<Tree> {
    match id {
        Some(id) => Ok(store.read_tree(&id)?),
        None => Ok(Tree::empty()),
    }
}

fn walk(
    store: &dyn ObjectStore,
    old: Option<ObjectId>,
    new: Option<ObjectId>,
    prefix: &str,
    out: &mut Vec<TreeChange>,
) -> DiffResult<()> {
    let old_tree = load(store, old)?;
    let new_tree = load(store, new)?;
    let names: BTreeSet<&str> = old_tree
        .entries
        .iter()
        .chain(&new_tree.entries)
        .map(|e| e.name.as_str())
        .collect();

    for name in names {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        let old_entry = old_tree.get(name);
        let new_entry = new_tree.get(name);

        let (old_dir, old_file) = split(old_entry);
        let (new_dir, new_file) = split(new_entry);

        if (old_dir.is_some() || new_dir.is_some()) && old_dir != new_dir {
            walk(store, old_dir, new_dir, &path, out)?;
        }
        if let Some(change) = TreeChange::between(path, old_file, new_file) {
            out.push(change);
        }
    }
    Ok(())
}

/// Split an entry into its subtree id or its file (mode, id).
fn split(entry: Option<&TreeEntry>) -> (Option<ObjectId>, Option<(EntryMode, ObjectId)>) {
    match entry {
        Some(e) if e.mode.is_tree() => (Some(e.object_id), None),
        Some(e) => (None, Some((e.mode, e.object_id))),
        None => (None, None),
    }
}

/// Compare two flat snapshots.
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> TreeDiff {
    let paths: BTreeSet<&str> = old.paths().chain(new.paths()).collect();
    let changes = paths
        .into_iter()
        .filter_map(|path| {
            let side = |s: &Snapshot| s.get(path).map(|e| (e.mode, e.id));
            TreeChange::between(path.to_string(), side(old), side(new))
        })
        .collect();
    TreeDiff { changes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckpt_store::InMemoryObjectStore;
    use ckpt_worktree::{build_tree, SnapshotEntry};

    fn oid(b: u8) -> ObjectId {
        ObjectId::from_hash([b; 32])
    }

    fn snapshot(files: &[(&str, u8, EntryMode)]) -> Snapshot {
        files
            .iter()
            .map(|(p, b, m)| (p.to_string(), SnapshotEntry::new(*m, oid(*b))))
            .collect()
    }

    fn tree_of(store: &dyn ObjectStore, files: &[(&str, u8, EntryMode)]) -> ObjectId {
        build_tree(store, &snapshot(files)).unwrap()
    }

    const R: EntryMode = EntryMode::Regular;

    #[test]
    fn empty_to_populated_all_additions() {
        let store = InMemoryObjectStore::new();
        let new = tree_of(&store, &[("a.txt", 1, R), ("dir/b.txt", 2, R)]);
        let diff = diff_trees(&store, None, Some(&new)).unwrap();
        assert_eq!(diff.paths(), ["a.txt", "dir/b.txt"]);
        assert!(diff.changes.iter().all(|c| c.kind() == ChangeKind::Added));
    }

    #[test]
    fn populated_to_empty_all_deletions() {
        let store = InMemoryObjectStore::new();
        let old = tree_of(&store, &[("a.txt", 1, R), ("dir/b.txt", 2, R)]);
        let diff = diff_trees(&store, Some(&old), None).unwrap();
        assert_eq!(diff.len(), 2);
        assert!(diff.changes.iter().all(|c| c.kind() == ChangeKind::Deleted));
    }

    #[test]
    fn identical_trees_no_changes() {
        let store = InMemoryObjectStore::new();
        let tree = tree_of(&store, &[("file.txt", 1, R)]);
        assert!(diff_trees(&store, Some(&tree), Some(&tree)).unwrap().is_empty());
    }

    #[test]
    fn nested_modification() {
        let store = InMemoryObjectStore::new();
        let old = tree_of(&store, &[("src/a.rs", 1, R), ("src/b.rs", 2, R), ("top", 3, R)]);
        let new = tree_of(&store, &[("src/a.rs", 1, R), ("src/b.rs", 9, R), ("top", 3, R)]);
        let diff = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        assert_eq!(
            diff.changes,
            vec![TreeChange::Modified {
                path: "src/b.rs".into(),
                old_id: oid(2),
                new_id: oid(9),
                old_mode: R,
                new_mode: R,
            }]
        );
    }

    #[test]
    fn mode_change_is_reported() {
        let store = InMemoryObjectStore::new();
        let old = tree_of(&store, &[("run.sh", 1, R)]);
        let new = tree_of(&store, &[("run.sh", 1, EntryMode::Executable)]);
        let diff = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.changes[0].kind(), ChangeKind::ModeChanged);
    }

    #[test]
    fn file_replaced_by_directory() {
        let store = InMemoryObjectStore::new();
        let old = tree_of(&store, &[("thing", 1, R), ("thing.txt", 5, R)]);
        let new = tree_of(&store, &[("thing/inner", 2, R), ("thing.txt", 5, R)]);
        let diff = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        assert_eq!(diff.paths(), ["thing", "thing/inner"]);
        assert_eq!(diff.changes[0].kind(), ChangeKind::Deleted);
        assert_eq!(diff.changes[1].kind(), ChangeKind::Added);
    }

    #[test]
    fn output_is_sorted_by_path() {
        let store = InMemoryObjectStore::new();
        let new = tree_of(&store, &[("a/x", 1, R), ("a.txt", 2, R), ("b", 3, R)]);
        let diff = diff_trees(&store, None, Some(&new)).unwrap();
        assert_eq!(diff.paths(), ["a.txt", "a/x", "b"]);
    }

    #[test]
    fn missing_tree_is_an_error() {
        let store = InMemoryObjectStore::new();
        assert!(diff_trees(&store, None, Some(&oid(7))).is_err());
    }

    #[test]
    fn snapshot_diff_matches_tree_diff() {
        let store = InMemoryObjectStore::new();
        let old_files = [("a", 1, R), ("d/b", 2, R), ("d/c", 3, R)];
        let new_files = [("a", 1, EntryMode::Executable), ("d/b", 4, R), ("e", 5, R)];
        let old = tree_of(&store, &old_files);
        let new = tree_of(&store, &new_files);

        let from_trees = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        let from_snapshots = diff_snapshots(&snapshot(&old_files), &snapshot(&new_files));
        assert_eq!(from_trees, from_snapshots);
        assert_eq!(from_trees.paths(), ["a", "d/b", "d/c", "e"]);
    }
}
