//! Conversion between flat snapshots and nested tree objects.

use std::collections::BTreeMap;

use ckpt_store::{EntryMode, ObjectStore, Tree, TreeEntry};
use ckpt_types::ObjectId;

use crate::error::{WorktreeError, WorktreeResult};
use crate::path::validate_name;
use crate::snapshot::{Snapshot, SnapshotEntry};

enum Node {
    File(SnapshotEntry),
    Dir(BTreeMap<String, Node>),
}

/// Write one tree object per directory in `snapshot` and return the root
/// tree's id. An empty snapshot yields the empty tree.
pub fn build_tree(store: &dyn ObjectStore, snapshot: &Snapshot) -> WorktreeResult<ObjectId> {
    let mut root: BTreeMap<String, Node> = BTreeMap::new();
    for (path, entry) in snapshot.iter() {
        insert(&mut root, path, path, *entry)?;
    }
    write_dir(store, root)
}

fn insert(
    dir: &mut BTreeMap<String, Node>,
    full: &str,
    rest: &str,
    entry: SnapshotEntry,
) -> WorktreeResult<()> {
    match rest.split_once('/') {
        None => {
            validate_name(rest)?;
            dir.insert(rest.to_string(), Node::File(entry));
            Ok(())
        }
        Some((head, tail)) => {
            validate_name(head)?;
            let child = dir
                .entry(head.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            match child {
                Node::Dir(children) => insert(children, full, tail, entry),
                Node::File(_) => Err(WorktreeError::invalid_path(
                    full,
                    format!("{head} is both a file and a directory"),
                )),
            }
        }
    }
}

fn write_dir(store: &dyn ObjectStore, dir: BTreeMap<String, Node>) -> WorktreeResult<ObjectId> {
    let mut entries = Vec::with_capacity(dir.len());
    for (name, node) in dir {
        let entry = match node {
            Node::File(file) => TreeEntry::new(file.mode, name, file.id),
            Node::Dir(children) => {
                TreeEntry::new(EntryMode::Directory, name, write_dir(store, children)?)
            }
        };
        entries.push(entry);
    }
    Ok(store.write_tree(&Tree::new(entries))?)
}

/// Read a tree (recursively) back into the flat snapshot form.
///
/// Entry names that could escape the workspace are rejected.
pub fn flatten_tree(store: &dyn ObjectStore, tree: &ObjectId) -> WorktreeResult<Snapshot> {
    let mut snapshot = Snapshot::new();
    flatten_into(store, tree, "", &mut snapshot)?;
    Ok(snapshot)
}

fn flatten_into(
    store: &dyn ObjectStore,
    tree: &ObjectId,
    prefix: &str,
    out: &mut Snapshot,
) -> WorktreeResult<()> {
    for entry in store.read_tree(tree)?.entries {
        validate_name(&entry.name)?;
        let path = if prefix.is_empty() {
            entry.name
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if entry.mode.is_tree() {
            flatten_into(store, &entry.object_id, &path, out)?;
        } else {
            out.insert(path, SnapshotEntry::new(entry.mode, entry.object_id));
        }
    }
    Ok(())
}

/// Look up a single file in a tree without flattening the whole thing.
///
/// Returns `None` if the path is absent or names a directory.
pub fn lookup_path(
    store: &dyn ObjectStore,
    tree: &ObjectId,
    path: &str,
) -> WorktreeResult<Option<SnapshotEntry>> {
    let mut current = *tree;
    let mut parts = path.split('/').peekable();
    while let Some(part) = parts.next() {
        let tree = store.read_tree(&current)?;
        let Some(entry) = tree.get(part) else {
            return Ok(None);
        };
        if parts.peek().is_none() {
            if entry.mode.is_tree() {
                return Ok(None);
            }
            return Ok(Some(SnapshotEntry::new(entry.mode, entry.object_id)));
        }
        if !entry.mode.is_tree() {
            return Ok(None);
        }
        current = entry.object_id;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckpt_store::InMemoryObjectStore;
    use proptest::prelude::*;

    fn file(store: &dyn ObjectStore, content: &str) -> SnapshotEntry {
        SnapshotEntry::new(EntryMode::Regular, store.write_blob(content.as_bytes()).unwrap())
    }

    #[test]
    fn nested_paths_become_subtrees() {
        let store = InMemoryObjectStore::new();
        let mut snap = Snapshot::new();
        snap.insert("README.md", file(&store, "readme"));
        snap.insert("src/lib.rs", file(&store, "lib"));
        snap.insert("src/bin/main.rs", file(&store, "main"));

        let root = build_tree(&store, &snap).unwrap();
        let tree = store.read_tree(&root).unwrap();
        assert_eq!(tree.len(), 2);
        let src = tree.get("src").unwrap();
        assert_eq!(src.mode, EntryMode::Directory);
        let src_tree = store.read_tree(&src.object_id).unwrap();
        assert!(src_tree.get("bin").unwrap().mode.is_tree());
        assert!(src_tree.get("lib.rs").is_some());
    }

    #[test]
    fn flatten_inverts_build() {
        let store = InMemoryObjectStore::new();
        let mut snap = Snapshot::new();
        snap.insert("a.txt", file(&store, "a"));
        snap.insert("d/e/f.txt", file(&store, "f"));
        snap.insert(
            "run.sh",
            SnapshotEntry::new(EntryMode::Executable, store.write_blob(b"#!").unwrap()),
        );
        let root = build_tree(&store, &snap).unwrap();
        assert_eq!(flatten_tree(&store, &root).unwrap(), snap);
    }

    #[test]
    fn empty_snapshot_is_empty_tree() {
        let store = InMemoryObjectStore::new();
        let root = build_tree(&store, &Snapshot::new()).unwrap();
        assert_eq!(root, Tree::empty().id().unwrap());
        assert!(flatten_tree(&store, &root).unwrap().is_empty());
    }

    #[test]
    fn unchanged_subtrees_keep_their_ids() {
        let store = InMemoryObjectStore::new();
        let mut snap = Snapshot::new();
        snap.insert("lib/x.rs", file(&store, "x"));
        snap.insert("top.txt", file(&store, "1"));
        let first = store.read_tree(&build_tree(&store, &snap).unwrap()).unwrap();

        snap.insert("top.txt", file(&store, "2"));
        let second = store.read_tree(&build_tree(&store, &snap).unwrap()).unwrap();
        assert_eq!(first.get("lib"), second.get("lib"));
        assert_ne!(first.get("top.txt"), second.get("top.txt"));
    }

    #[test]
    fn file_directory_clash_is_rejected() {
        let store = InMemoryObjectStore::new();
        let mut snap = Snapshot::new();
        snap.insert("a", file(&store, "file"));
        snap.insert("a/b", file(&store, "nested"));
        assert!(matches!(
            build_tree(&store, &snap),
            Err(WorktreeError::InvalidPath { .. })
        ));
    }

    #[test]
    fn flatten_rejects_traversal_names() {
        let store = InMemoryObjectStore::new();
        let blob = store.write_blob(b"evil").unwrap();
        let tree = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "..", blob)]);
        let id = store.write_tree(&tree).unwrap();
        assert!(matches!(
            flatten_tree(&store, &id),
            Err(WorktreeError::InvalidPath { .. })
        ));
    }

    #[test]
    fn lookup_finds_files_only() {
        let store = InMemoryObjectStore::new();
        let mut snap = Snapshot::new();
        let entry = file(&store, "deep");
        snap.insert("a/b/c.txt", entry);
        let root = build_tree(&store, &snap).unwrap();

        assert_eq!(lookup_path(&store, &root, "a/b/c.txt").unwrap(), Some(entry));
        assert_eq!(lookup_path(&store, &root, "a/b").unwrap(), None);
        assert_eq!(lookup_path(&store, &root, "a/b/c.txt/x").unwrap(), None);
        assert_eq!(lookup_path(&store, &root, "missing").unwrap(), None);
    }

    proptest! {
        #[test]
        fn tree_id_is_independent_of_insertion_order(
            files in proptest::collection::btree_map("[a-c]{1,2}(/[a-c]{1,2}){0,2}\\.t", "[a-z]{0,6}", 1..16),
        ) {
            let store = InMemoryObjectStore::new();
            let forward: Snapshot = files
                .iter()
                .map(|(p, c)| (p.clone(), file(&store, c)))
                .collect();
            let reversed: Snapshot = files
                .iter()
                .rev()
                .map(|(p, c)| (p.clone(), file(&store, c)))
                .collect();
            prop_assert_eq!(
                build_tree(&store, &forward).unwrap(),
                build_tree(&store, &reversed).unwrap()
            );
        }
    }
}
