use std::time::{SystemTime, UNIX_EPOCH};

use ckpt_crypto::ContentHasher;
use ckpt_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw content (file contents, symlink targets).
    Blob,
    /// Directory listing: ordered entries mapping names to object references.
    Tree,
    /// Snapshot record linking a root tree to its predecessor.
    Commit,
}

impl ObjectKind {
    /// Single-byte tag used in the on-disk object header.
    pub fn type_byte(&self) -> u8 {
        match self {
            Self::Blob => 1,
            Self::Tree => 2,
            Self::Commit => 3,
        }
    }

    /// Parse an on-disk type tag.
    pub fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Blob),
            2 => Some(Self::Tree),
            3 => Some(Self::Commit),
            _ => None,
        }
    }

    fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::Blob => &ContentHasher::BLOB,
            Self::Tree => &ContentHasher::TREE,
            Self::Commit => &ContentHasher::COMMIT,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// A stored object: kind tag + serialized data + cached size.
///
/// `StoredObject` is the unit of storage. Backends never interpret `data`;
/// they only key it by [`compute_id`](Self::compute_id).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The serialized bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    ///
    /// Uses the domain-separated hasher of the object's kind.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }

    fn expect_kind(&self, kind: ObjectKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(StoreError::CorruptObject {
                id: self.compute_id(),
                reason: format!("expected {kind}, got {}", self.kind),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object: one file's bytes at a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from raw bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The identifier this blob will have once stored.
    pub fn id(&self) -> ObjectId {
        ContentHasher::BLOB.hash(&self.data)
    }

    /// Convert into a `StoredObject` for storage.
    pub fn into_stored_object(self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data)
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Blob)?;
        Ok(Self { data: obj.data })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000). The blob holds the link target.
    Symlink,
    /// Subtree / directory (0o040000).
    Directory,
}

impl EntryMode {
    /// Octal mode value, as shown in patch headers.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            0o120000 => Some(Self::Symlink),
            0o040000 => Some(Self::Directory),
            _ => None,
        }
    }

    /// Returns `true` for subtree entries.
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File mode (regular, executable, symlink, directory).
    pub mode: EntryMode,
    /// Entry name: a single path segment.
    pub name: String,
    /// Content-addressed ID of the referenced blob or tree.
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// Directory listing object.
///
/// Entries are always kept sorted by name, so a tree's identity depends only
/// on its (name → entry) contents and never on insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Sorted entries in this directory.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries, sorted by name.
    ///
    /// When the same name appears more than once the last entry wins.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.reverse();
        entries.sort();
        entries.dedup_by(|a, b| a.name == b.name);
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Tree)?;
        serde_json::from_slice(&obj.data).map_err(|e| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: e.to_string(),
        })
    }

    /// The identifier this tree will have once stored.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Snapshot record: a root tree, its predecessor, a message and a timestamp.
///
/// Commits form a strictly linear chain per workspace; `parent` is `None`
/// only for the first commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// The previous commit, if any.
    pub parent: Option<ObjectId>,
    /// Free-form message (possibly empty).
    pub message: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl Commit {
    /// Create a commit stamped with the current wall-clock time.
    pub fn new(tree: ObjectId, parent: Option<ObjectId>, message: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            tree,
            parent,
            message: message.into(),
            timestamp_ms,
        }
    }

    /// Returns `true` for the first commit of a chain.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Commit, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Commit)?;
        serde_json::from_slice(&obj.data).map_err(|e| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn blob_kind_mismatch_is_corruption() {
        let stored = StoredObject::new(ObjectKind::Tree, b"not a blob".to_vec());
        let err = Blob::from_stored_object(stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn blob_id_matches_stored_id() {
        let blob = Blob::new(b"hello".to_vec());
        let id = blob.id();
        assert_eq!(id, blob.into_stored_object().compute_id());
    }

    #[test]
    fn tree_entries_sorted() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "zebra.txt", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "alpha.txt", ObjectId::null()),
            TreeEntry::new(EntryMode::Directory, "middle", ObjectId::null()),
        ]);
        let names: Vec<&str> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha.txt", "middle", "zebra.txt"]);
    }

    #[test]
    fn tree_duplicate_names_keep_last() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "a", ObjectId::from_bytes(b"first")),
            TreeEntry::new(EntryMode::Regular, "a", ObjectId::from_bytes(b"second")),
        ]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.entries[0].object_id, ObjectId::from_bytes(b"second"));
    }

    #[test]
    fn tree_get_entry() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "a.txt", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "b.txt", ObjectId::from_bytes(b"b")),
        ]);
        assert!(tree.get("a.txt").is_some());
        assert_eq!(tree.get("b.txt").unwrap().object_id, ObjectId::from_bytes(b"b"));
        assert!(tree.get("missing").is_none());
    }

    #[test]
    fn tree_decode_rejects_garbage() {
        let stored = StoredObject::new(ObjectKind::Tree, b"{not json".to_vec());
        assert!(matches!(
            Tree::from_stored_object(&stored),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn commit_ids_depend_on_parent_and_message() {
        let tree = ObjectId::from_bytes(b"tree");
        let mut a = Commit::new(tree, None, "msg");
        a.timestamp_ms = 1_000;
        let mut b = a.clone();
        b.parent = Some(ObjectId::from_bytes(b"parent"));
        let mut c = a.clone();
        c.message = "other".into();

        let id = |c: &Commit| c.to_stored_object().unwrap().compute_id();
        assert_ne!(id(&a), id(&b));
        assert_ne!(id(&a), id(&c));
        assert_eq!(id(&a), id(&a.clone()));
    }

    #[test]
    fn commit_decode_rejects_tree_object() {
        let stored = Tree::empty().to_stored_object().unwrap();
        assert!(Commit::from_stored_object(&stored).is_err());
    }

    #[test]
    fn entry_mode_bits_roundtrip() {
        for mode in [
            EntryMode::Regular,
            EntryMode::Executable,
            EntryMode::Symlink,
            EntryMode::Directory,
        ] {
            assert_eq!(EntryMode::from_mode_bits(mode.mode_bits()), Some(mode));
        }
        assert!(EntryMode::from_mode_bits(0o777).is_none());
    }

    #[test]
    fn type_byte_roundtrip_and_unknown() {
        for kind in [ObjectKind::Blob, ObjectKind::Tree, ObjectKind::Commit] {
            assert_eq!(ObjectKind::from_type_byte(kind.type_byte()), Some(kind));
        }
        assert_eq!(ObjectKind::from_type_byte(0), None);
    }

    #[test]
    fn different_kinds_produce_different_ids() {
        let data = b"same data".to_vec();
        let blob = StoredObject::new(ObjectKind::Blob, data.clone());
        let tree = StoredObject::new(ObjectKind::Tree, data.clone());
        let commit = StoredObject::new(ObjectKind::Commit, data);
        assert_ne!(blob.compute_id(), tree.compute_id());
        assert_ne!(blob.compute_id(), commit.compute_id());
    }

    proptest! {
        #[test]
        fn tree_id_ignores_entry_order(
            names in proptest::collection::btree_set("[a-z]{1,8}", 1..12),
            seed in any::<u64>(),
        ) {
            let entries: Vec<TreeEntry> = names
                .iter()
                .map(|n| TreeEntry::new(EntryMode::Regular, n.clone(), ObjectId::from_bytes(n.as_bytes())))
                .collect();
            let mut shuffled = entries.clone();
            // Deterministic rotation + reversal stands in for an arbitrary listing order.
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            if seed % 2 == 0 {
                shuffled.reverse();
            }
            prop_assert_eq!(Tree::new(entries).id().unwrap(), Tree::new(shuffled).id().unwrap());
        }
    }
}
