use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ckpt_types::ObjectId;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// zstd level used for loose objects.
const COMPRESSION_LEVEL: i32 = 3;

/// On-disk object store: one file per object under `objects/<hh>/<rest>`.
///
/// Each file holds a single kind byte followed by the zstd-compressed
/// payload. Files are written to a temporary sibling and renamed into place,
/// so a reader never observes a partially written object. Every read
/// re-hashes the payload and reports [`StoreError::HashMismatch`] when the
/// file no longer matches its name.
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    root: PathBuf,
}

impl LooseObjectStore {
    /// Open (creating if needed) an object directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The object directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path holding the object with the given ID.
    pub fn path_for(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        let (fanout, rest) = hex.split_at(2);
        self.root.join(fanout).join(rest)
    }

    /// Every object ID present on disk, sorted.
    ///
    /// Stray files whose names are not valid IDs are skipped.
    pub fn all_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            let hex: String = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            match ObjectId::from_hex(&hex) {
                Ok(id) => ids.push(id),
                Err(_) => tracing::debug!(path = ?entry.path(), "ignoring stray file"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn decode(id: &ObjectId, raw: &[u8]) -> StoreResult<StoredObject> {
        let (&type_byte, compressed) = raw.split_first().ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: "empty object file".into(),
        })?;
        let kind = ObjectKind::from_type_byte(type_byte).ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: format!("unknown type byte: {type_byte}"),
        })?;
        let data = zstd::decode_all(compressed).map_err(|e| StoreError::CorruptObject {
            id: *id,
            reason: format!("decompression failed: {e}"),
        })?;
        Ok(StoredObject::new(kind, data))
    }
}

impl ObjectStore for LooseObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let raw = match fs::read(self.path_for(id)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = Self::decode(id, &raw)?;
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let path = self.path_for(&id);
        if path.exists() {
            return Ok(id);
        }
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        let compressed = zstd::encode_all(object.data.as_slice(), COMPRESSION_LEVEL)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&[object.kind.type_byte()])?;
        tmp.write_all(&compressed)?;
        tmp.as_file().sync_all()?;
        if let Err(e) = tmp.persist(&path) {
            // Another writer may have landed the same object first.
            if !path.exists() {
                return Err(e.error.into());
            }
        }
        tracing::debug!(id = %id.short_hex(), kind = %object.kind, size = object.size, "wrote object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.path_for(id).is_file())
    }
}
