//! File-backed HEAD: a single file holding the commit id in hex.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ckpt_types::ObjectId;
use tempfile::NamedTempFile;

use crate::error::{RefError, Result};
use crate::traits::HeadStore;

/// HEAD persisted as `<hex>\n` in a file.
///
/// Updates are written to a temporary sibling, synced, and renamed over the
/// old file. A missing file means HEAD is unset.
#[derive(Debug, Clone)]
pub struct FileHeadStore {
    path: PathBuf,
}

impl FileHeadStore {
    /// Use the file at `path`. The file is not created until the first
    /// [`set_head`](HeadStore::set_head).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the HEAD file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HeadStore for FileHeadStore {
    fn head(&self) -> Result<Option<ObjectId>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        ObjectId::from_hex(&text)
            .map(Some)
            .map_err(|e| RefError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    fn set_head(&self, commit: &ObjectId) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        writeln!(tmp, "{commit}")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        tracing::debug!(head = %commit.short_hex(), path = ?self.path, "moved HEAD");
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_unset() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHeadStore::new(dir.path().join("HEAD"));
        assert_eq!(store.head().unwrap(), None);
    }

    #[test]
    fn set_writes_hex_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHeadStore::new(dir.path().join("HEAD"));
        let id = ObjectId::from_bytes(b"commit");
        store.set_head(&id).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, format!("{}\n", id.to_hex()));
        assert_eq!(store.head().unwrap(), Some(id));
    }

    #[test]
    fn overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHeadStore::new(dir.path().join("HEAD"));
        for i in 0..5u8 {
            store.set_head(&ObjectId::from_bytes(&[i])).unwrap();
        }
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("HEAD")]);
        assert_eq!(store.head().unwrap(), Some(ObjectId::from_bytes(&[4])));
    }

    #[test]
    fn visible_to_second_handle() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileHeadStore::new(dir.path().join("HEAD"));
        let reader = FileHeadStore::new(dir.path().join("HEAD"));
        let id = ObjectId::from_bytes(b"shared");
        writer.set_head(&id).unwrap();
        assert_eq!(reader.head().unwrap(), Some(id));
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("HEAD");
        fs::write(&path, "ref: refs/heads/main\n").unwrap();
        let store = FileHeadStore::new(&path);
        assert!(matches!(store.head(), Err(RefError::Corrupt { .. })));
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHeadStore::new(dir.path().join("HEAD"));
        store.set_head(&ObjectId::from_bytes(b"x")).unwrap();
        assert!(store.clear().unwrap());
        assert!(!store.path().exists());
        assert!(!store.clear().unwrap());
    }
}
