//! Materializing a snapshot into the workspace.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ckpt_store::{EntryMode, ObjectStore};
use tempfile::NamedTempFile;

use crate::error::{WorktreeError, WorktreeResult};
use crate::path::resolve;
use crate::snapshot::{Snapshot, SnapshotEntry};

/// What a checkout changed on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckoutReport {
    /// Paths whose content or mode was (re)written.
    pub written: Vec<String>,
    /// Paths removed because the target does not contain them.
    pub deleted: Vec<String>,
}

/// Writes snapshots into a workspace directory.
#[derive(Clone, Debug)]
pub struct Checkout {
    root: PathBuf,
}

impl Checkout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Make the workspace match `target`, given that it currently matches
    /// `current`.
    ///
    /// Every blob the target needs is loaded (and verified by the store),
    /// and every path it writes is checked for obstructions, before the first
    /// file is touched. Paths outside `current` and `target` are left alone,
    /// so ignored files survive.
    pub fn apply(
        &self,
        store: &dyn ObjectStore,
        target: &Snapshot,
        current: &Snapshot,
    ) -> WorktreeResult<CheckoutReport> {
        let removable = |p: &str| current.contains(p) && !target.contains(p);
        let mut pending = Vec::new();
        for (path, entry) in target.iter() {
            if current.get(path) != Some(entry) {
                let content = store.read_blob(&entry.id)?.data;
                self.check_parents(path, &removable)?;
                let abs = resolve(&self.root, path);
                let is_dir = fs::symlink_metadata(&abs).map(|m| m.is_dir()).unwrap_or(false);
                if is_dir && !dir_clears(&self.root, path, &removable) {
                    return Err(WorktreeError::Obstructed(path.to_string()));
                }
                pending.push((path, *entry, content));
            }
        }
        let stale: Vec<&str> = current.paths().filter(|p| !target.contains(p)).collect();

        let mut report = CheckoutReport::default();
        let mut emptied = BTreeSet::new();
        for path in stale.iter().rev() {
            let abs = resolve(&self.root, path);
            match fs::remove_file(&abs) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(WorktreeError::write(abs, e)),
            }
            collect_parents(&self.root, &abs, &mut emptied);
            report.deleted.push(path.to_string());
        }
        self.prune_dirs(emptied);

        for (path, entry, content) in pending {
            write_file(&resolve(&self.root, path), entry.mode, &content)
                .map_err(|e| match e {
                    WriteError::Obstructed => WorktreeError::Obstructed(path.to_string()),
                    WriteError::Io(abs, source) => WorktreeError::write(abs, source),
                })?;
            report.written.push(path.to_string());
        }

        tracing::debug!(
            root = ?self.root,
            written = report.written.len(),
            deleted = report.deleted.len(),
            "checkout applied"
        );
        Ok(report)
    }

    /// Write a single file from the store, leaving everything else alone.
    pub fn restore(
        &self,
        store: &dyn ObjectStore,
        path: &str,
        entry: &SnapshotEntry,
    ) -> WorktreeResult<()> {
        let content = store.read_blob(&entry.id)?.data;
        self.check_parents(path, &|_: &str| false)?;
        write_file(&resolve(&self.root, path), entry.mode, &content).map_err(|e| match e {
            WriteError::Obstructed => WorktreeError::Obstructed(path.to_string()),
            WriteError::Io(abs, source) => WorktreeError::write(abs, source),
        })
    }

    /// Refuse to write `path` through a symlink or a non-directory parent,
    /// unless that parent is one `removable` says will be deleted first.
    fn check_parents(&self, path: &str, removable: &dyn Fn(&str) -> bool) -> WorktreeResult<()> {
        let parts: Vec<&str> = path.split('/').collect();
        for end in 1..parts.len() {
            let prefix = parts[..end].join("/");
            let abs = resolve(&self.root, &prefix);
            let meta = match fs::symlink_metadata(&abs) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(WorktreeError::write(abs, e)),
            };
            if meta.is_dir() {
                continue;
            }
            if removable(prefix.as_str()) {
                return Ok(());
            }
            if meta.file_type().is_symlink() {
                return Err(WorktreeError::invalid_path(path, "beyond a symbolic link"));
            }
            return Err(WorktreeError::Obstructed(path.to_string()));
        }
        Ok(())
    }

    /// Remove directories left empty by deletions, deepest first.
    /// Directories that still hold anything (such as ignored files) stay.
    fn prune_dirs(&self, dirs: BTreeSet<PathBuf>) {
        let mut dirs: Vec<PathBuf> = dirs.into_iter().collect();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        for dir in dirs {
            if fs::remove_dir(&dir).is_ok() {
                tracing::debug!(dir = ?dir, "removed empty directory");
            }
        }
    }
}

/// Whether deleting the removable files under directory `dir` leaves
/// nothing behind, so pruning will remove the directory itself.
fn dir_clears(root: &Path, dir: &str, removable: &dyn Fn(&str) -> bool) -> bool {
    let Ok(entries) = fs::read_dir(resolve(root, dir)) else {
        return false;
    };
    let mut any = false;
    for entry in entries {
        let Ok(entry) = entry else {
            return false;
        };
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            return false;
        };
        let key = format!("{dir}/{name}");
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let clears = if is_dir {
            dir_clears(root, &key, removable)
        } else {
            removable(&key)
        };
        if !clears {
            return false;
        }
        any = true;
    }
    any
}

fn collect_parents(root: &Path, file: &Path, out: &mut BTreeSet<PathBuf>) {
    let mut dir = file.parent();
    while let Some(d) = dir {
        if d == root || !d.starts_with(root) {
            break;
        }
        out.insert(d.to_path_buf());
        dir = d.parent();
    }
}

enum WriteError {
    Obstructed,
    Io(PathBuf, io::Error),
}

fn write_file(abs: &Path, mode: EntryMode, content: &[u8]) -> Result<(), WriteError> {
    let io_err = |e: io::Error| WriteError::Io(abs.to_path_buf(), e);

    if let Ok(meta) = fs::symlink_metadata(abs) {
        if meta.is_dir() {
            return Err(WriteError::Obstructed);
        }
    }
    let dir = abs
        .parent()
        .ok_or_else(|| io_err(io::Error::new(io::ErrorKind::InvalidInput, "no parent directory")))?;
    fs::create_dir_all(dir).map_err(io_err)?;

    if mode == EntryMode::Symlink {
        return write_symlink(abs, content).map_err(io_err);
    }

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(content).map_err(io_err)?;
    set_mode(tmp.as_file(), mode).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(abs).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(file: &fs::File, mode: EntryMode) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let bits = if mode == EntryMode::Executable { 0o755 } else { 0o644 };
    file.set_permissions(fs::Permissions::from_mode(bits))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _mode: EntryMode) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn write_symlink(abs: &Path, target: &[u8]) -> io::Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    match fs::remove_file(abs) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::os::unix::fs::symlink(OsStr::from_bytes(target), abs)
}

#[cfg(not(unix))]
fn write_symlink(abs: &Path, target: &[u8]) -> io::Result<()> {
    fs::write(abs, target)
}
