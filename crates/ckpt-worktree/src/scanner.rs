//! Working-tree scanning.
//!
//! [`Scanner`] walks a workspace with the `ignore` crate's walker, applies the
//! [`IgnorePolicy`], and reduces every captured file to a [`SnapshotEntry`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ckpt_crypto::ContentHasher;
use ckpt_store::{EntryMode, ObjectStore};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::{DirEntry, WalkBuilder};

use crate::error::{WorktreeError, WorktreeResult};
use crate::snapshot::{Snapshot, SnapshotEntry};

/// Directory name that is never captured or touched.
pub const VCS_DIR: &str = ".git";

/// What a scan leaves out.
///
/// `.git` is always excluded regardless of policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IgnorePolicy {
    /// Honor `.gitignore` files found inside the workspace.
    pub respect_gitignore: bool,
    /// Extra patterns in gitignore syntax, rooted at the workspace.
    pub patterns: Vec<String>,
    /// Absolute paths excluded along with everything below them.
    pub excluded: Vec<PathBuf>,
}

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            patterns: Vec::new(),
            excluded: Vec::new(),
        }
    }
}

impl IgnorePolicy {
    /// Add an absolute path to exclude.
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }
}

/// Walks one workspace according to an [`IgnorePolicy`].
#[derive(Clone)]
pub struct Scanner {
    root: PathBuf,
    policy: IgnorePolicy,
    patterns: Arc<Gitignore>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("root", &self.root)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Scanner {
    /// Create a scanner for `root`, compiling the policy's extra patterns.
    pub fn new(root: impl Into<PathBuf>, policy: IgnorePolicy) -> WorktreeResult<Self> {
        let root = root.into();
        let mut builder = GitignoreBuilder::new(&root);
        for pattern in &policy.patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| WorktreeError::Pattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
        }
        let patterns = builder.build().map_err(|e| WorktreeError::Pattern {
            pattern: policy.patterns.join(", "),
            reason: e.to_string(),
        })?;
        Ok(Self {
            root,
            policy,
            patterns: Arc::new(patterns),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> &IgnorePolicy {
        &self.policy
    }

    /// Walk the workspace, write every file's content as a blob, and return
    /// the resulting snapshot.
    pub fn capture(&self, store: &dyn ObjectStore) -> WorktreeResult<Snapshot> {
        let snapshot = self.scan(|content| Ok(store.write_blob(content)?))?;
        tracing::debug!(root = ?self.root, files = snapshot.len(), "captured working tree");
        Ok(snapshot)
    }

    /// Walk the workspace and hash every file without storing anything.
    pub fn inspect(&self) -> WorktreeResult<Snapshot> {
        self.scan(|content| Ok(ContentHasher::BLOB.hash(content)))
    }

    /// Whether `rel` (a workspace-relative key) is hidden from scans.
    ///
    /// Only the policy's fixed rules are consulted: `.git`, excluded paths and
    /// extra patterns. `.gitignore` files are evaluated by the walker.
    pub fn is_excluded(&self, rel: &str, is_dir: bool) -> bool {
        let path = crate::path::resolve(&self.root, rel);
        rel.split('/').any(|part| part == VCS_DIR)
            || self.policy.excluded.iter().any(|ex| path.starts_with(ex))
            || self
                .patterns
                .matched_path_or_any_parents(&path, is_dir)
                .is_ignore()
    }

    fn scan<F>(&self, mut store_blob: F) -> WorktreeResult<Snapshot>
    where
        F: FnMut(&[u8]) -> WorktreeResult<ckpt_types::ObjectId>,
    {
        let excluded = self.policy.excluded.clone();
        let patterns = Arc::clone(&self.patterns);
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .parents(false)
            .ignore(false)
            .git_ignore(self.policy.respect_gitignore)
            .git_global(false)
            .git_exclude(false)
            .require_git(false)
            .follow_links(false)
            .filter_entry(move |entry| keep_entry(entry, &excluded, &patterns))
            .build();

        let mut snapshot = Snapshot::new();
        for result in walker {
            let entry = result.map_err(|e| scan_failure(&self.root, e))?;
            if entry.depth() == 0 {
                continue;
            }
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                continue;
            }

            let path = entry.path();
            let rel = relative_key(&self.root, path)?;
            let failure = |e: std::io::Error| WorktreeError::ScanFailure {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };

            let (mode, content) = if file_type.is_symlink() {
                let target = fs::read_link(path).map_err(failure)?;
                (EntryMode::Symlink, link_bytes(&target))
            } else {
                let metadata = entry.metadata().map_err(|e| WorktreeError::ScanFailure {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
                let content = fs::read(path).map_err(failure)?;
                (file_mode(&metadata), content)
            };

            let id = store_blob(&content)?;
            snapshot.insert(rel, SnapshotEntry::new(mode, id));
        }
        Ok(snapshot)
    }
}

fn keep_entry(entry: &DirEntry, excluded: &[PathBuf], patterns: &Gitignore) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if entry.file_name() == VCS_DIR {
        return false;
    }
    let path = entry.path();
    if excluded.iter().any(|ex| path.starts_with(ex)) {
        tracing::debug!(path = ?path, "skipping excluded path");
        return false;
    }
    let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
    !patterns.matched(path, is_dir).is_ignore()
}

fn relative_key(root: &Path, path: &Path) -> WorktreeResult<String> {
    let rel = path.strip_prefix(root).map_err(|_| WorktreeError::ScanFailure {
        path: path.to_path_buf(),
        reason: "walked outside the workspace".into(),
    })?;
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| WorktreeError::ScanFailure {
                path: path.to_path_buf(),
                reason: "file name is not valid UTF-8".into(),
            })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

fn scan_failure(root: &Path, err: ignore::Error) -> WorktreeError {
    let path = error_path(&err).unwrap_or(root).to_path_buf();
    WorktreeError::ScanFailure {
        path,
        reason: err.to_string(),
    }
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> EntryMode {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        EntryMode::Executable
    } else {
        EntryMode::Regular
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> EntryMode {
    EntryMode::Regular
}

#[cfg(unix)]
fn link_bytes(target: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    target.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn link_bytes(target: &Path) -> Vec<u8> {
    target.to_string_lossy().into_owned().into_bytes()
}
