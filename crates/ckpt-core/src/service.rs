//! Registry of checkpoint stores rooted at one directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use ckpt_worktree::IgnorePolicy;
use tracing::{debug, info, warn};

use crate::cache::LruCache;
use crate::config::{CheckpointConfig, DEFAULT_CACHE_SIZE};
use crate::error::{CheckpointError, CheckpointResult};
use crate::layout::{store_dir_name, StoreLayout, WorkspaceRecord};
use crate::store::CheckpointStore;

/// Opens and caches [`CheckpointStore`]s, one per workspace.
///
/// Store directories live directly under `stores_root`. At most
/// `cache_size` handles are kept open; the least recently used one is
/// dropped from the cache when a new workspace is opened. Evicting a handle
/// never touches its files, and callers still holding it may keep using it.
#[derive(Debug)]
pub struct CheckpointService {
    stores_root: PathBuf,
    policy: IgnorePolicy,
    cache: Mutex<LruCache<PathBuf, CheckpointStore>>,
}

impl CheckpointService {
    /// Create a service over `stores_root`, creating the directory if
    /// missing. A `cache_size` of `None` means the default of 10.
    pub fn new(stores_root: impl AsRef<Path>, cache_size: Option<usize>) -> CheckpointResult<Self> {
        Self::build(
            stores_root.as_ref(),
            cache_size.unwrap_or(DEFAULT_CACHE_SIZE),
            IgnorePolicy::default(),
        )
    }

    /// Create a service from a loaded [`CheckpointConfig`].
    pub fn with_config(config: &CheckpointConfig) -> CheckpointResult<Self> {
        Self::build(&config.stores_root, config.cache_size, config.ignore_policy())
    }

    fn build(stores_root: &Path, cache_size: usize, policy: IgnorePolicy) -> CheckpointResult<Self> {
        fs::create_dir_all(stores_root).map_err(|e| unavailable(stores_root, e))?;
        let stores_root = fs::canonicalize(stores_root).map_err(|e| unavailable(stores_root, e))?;
        debug!(stores_root = ?stores_root, cache_size, "checkpoint service ready");
        Ok(Self {
            stores_root,
            policy,
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    /// The canonical directory holding every store.
    pub fn stores_root(&self) -> &Path {
        &self.stores_root
    }

    /// The store for `workspace`, opening or creating it on a cache miss.
    ///
    /// Relative paths are made absolute against the current directory.
    /// Symlinks are not resolved, so the same path string always maps to
    /// the same store.
    pub fn get_store(&self, workspace: impl AsRef<Path>) -> CheckpointResult<CheckpointStore> {
        let workspace = absolute(workspace.as_ref())?;
        let mut cache = self.lock_cache()?;
        if let Some(store) = cache.get(&workspace) {
            return Ok(store.clone());
        }

        let store = CheckpointStore::open(
            &workspace,
            self.store_dir(&workspace),
            self.policy_for(&workspace),
        )?;
        if let Some((evicted, _)) = cache.insert(workspace, store.clone()) {
            debug!(workspace = ?evicted, "evicted checkpoint store from cache");
        }
        Ok(store)
    }

    /// Every workspace with a store under `stores_root`, sorted.
    ///
    /// Directories without a readable workspace record are skipped.
    pub fn workspaces(&self) -> CheckpointResult<Vec<PathBuf>> {
        let mut workspaces: Vec<PathBuf> = self
            .records()?
            .into_iter()
            .map(|(_, record)| record.workspace)
            .collect();
        workspaces.sort();
        Ok(workspaces)
    }

    /// Workspaces with a cached handle, most recently used first.
    pub fn cached_workspaces(&self) -> CheckpointResult<Vec<PathBuf>> {
        Ok(self.lock_cache()?.keys().cloned().collect())
    }

    /// Delete the store of `workspace` and evict its handle.
    ///
    /// Returns `false` when the workspace had no store. The workspace
    /// itself is not touched.
    pub fn drop_store(&self, workspace: impl AsRef<Path>) -> CheckpointResult<bool> {
        let workspace = absolute(workspace.as_ref())?;
        let mut cache = self.lock_cache()?;
        cache.remove(&workspace);

        let dir = self.store_dir(&workspace);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!(workspace = ?workspace, store = ?dir, "dropped checkpoint store");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(unavailable(&dir, e)),
        }
    }

    /// Delete stores whose workspace directory no longer exists.
    ///
    /// Returns the pruned workspaces, sorted.
    pub fn prune(&self) -> CheckpointResult<Vec<PathBuf>> {
        let mut cache = self.lock_cache()?;
        let mut pruned = Vec::new();
        for (layout, record) in self.records()? {
            if record.workspace.is_dir() {
                continue;
            }
            fs::remove_dir_all(layout.dir()).map_err(|e| unavailable(layout.dir(), e))?;
            cache.remove(&record.workspace);
            info!(workspace = ?record.workspace, store = ?layout.dir(), "pruned checkpoint store");
            pruned.push(record.workspace);
        }
        pruned.sort();
        Ok(pruned)
    }

    fn store_dir(&self, workspace: &Path) -> PathBuf {
        self.stores_root.join(store_dir_name(workspace))
    }

    /// The configured policy, plus `stores_root` when it sits inside the
    /// workspace. The exclusion is expressed under the workspace path as
    /// given, which is the form the scanner walks.
    fn policy_for(&self, workspace: &Path) -> IgnorePolicy {
        let policy = self.policy.clone();
        let real = fs::canonicalize(workspace).unwrap_or_else(|_| workspace.to_path_buf());
        match self.stores_root.strip_prefix(&real) {
            Ok(rel) => policy.exclude(workspace.join(rel)),
            Err(_) => policy,
        }
    }

    fn records(&self) -> CheckpointResult<Vec<(StoreLayout, WorkspaceRecord)>> {
        let entries =
            fs::read_dir(&self.stores_root).map_err(|e| unavailable(&self.stores_root, e))?;
        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| unavailable(&self.stores_root, e))?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let layout = StoreLayout::new(entry.path());
            match WorkspaceRecord::load(&layout) {
                Ok(Some(record)) => records.push((layout, record)),
                Ok(None) => {
                    warn!(dir = ?layout.dir(), "skipping directory without workspace record");
                }
                Err(e) => {
                    warn!(dir = ?layout.dir(), error = %e, "skipping unreadable store");
                }
            }
        }
        Ok(records)
    }

    fn lock_cache(&self) -> CheckpointResult<MutexGuard<'_, LruCache<PathBuf, CheckpointStore>>> {
        self.cache
            .lock()
            .map_err(|_| CheckpointError::StoreUnavailable("store cache lock poisoned".to_string()))
    }
}

fn absolute(path: &Path) -> CheckpointResult<PathBuf> {
    std::path::absolute(path).map_err(|e| CheckpointError::InvalidPath {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn unavailable(path: &Path, e: io::Error) -> CheckpointError {
    CheckpointError::StoreUnavailable(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(root: &Path, cache_size: usize) -> CheckpointService {
        CheckpointService::new(root, Some(cache_size)).unwrap()
    }

    #[test]
    fn creates_missing_stores_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a/b/stores");
        let svc = service(&root, 2);
        assert!(root.is_dir());
        assert!(svc.workspaces().unwrap().is_empty());
    }

    #[test]
    fn same_workspace_shares_one_handle() {
        let stores = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let svc = service(stores.path(), 2);

        let a = svc.get_store(ws.path()).unwrap();
        fs::write(ws.path().join("f.txt"), "x").unwrap();
        let id = a.save(None).unwrap();

        let b = svc.get_store(ws.path()).unwrap();
        assert_eq!(b.head().unwrap(), id);
        assert_eq!(a.store_dir(), b.store_dir());
    }

    #[test]
    fn distinct_workspaces_get_distinct_stores() {
        let stores = tempfile::tempdir().unwrap();
        let ws1 = tempfile::tempdir().unwrap();
        let ws2 = tempfile::tempdir().unwrap();
        let svc = service(stores.path(), 4);

        fs::write(ws1.path().join("f.txt"), "one").unwrap();
        fs::write(ws2.path().join("f.txt"), "two").unwrap();
        let a = svc.get_store(ws1.path()).unwrap();
        let b = svc.get_store(ws2.path()).unwrap();
        assert_ne!(a.store_dir(), b.store_dir());
        assert_ne!(a.save(None).unwrap(), b.save(None).unwrap());

        let mut expected = vec![ws1.path().to_path_buf(), ws2.path().to_path_buf()];
        expected.sort();
        assert_eq!(svc.workspaces().unwrap(), expected);
    }

    #[test]
    fn eviction_keeps_history_on_disk() {
        let stores = tempfile::tempdir().unwrap();
        let ws1 = tempfile::tempdir().unwrap();
        let ws2 = tempfile::tempdir().unwrap();
        let ws3 = tempfile::tempdir().unwrap();
        let svc = service(stores.path(), 2);

        fs::write(ws1.path().join("f.txt"), "one").unwrap();
        let first = svc.get_store(ws1.path()).unwrap().save(Some("ws1")).unwrap();
        svc.get_store(ws2.path()).unwrap();
        svc.get_store(ws3.path()).unwrap();

        assert_eq!(
            svc.cached_workspaces().unwrap(),
            vec![ws3.path().to_path_buf(), ws2.path().to_path_buf()]
        );

        let reopened = svc.get_store(ws1.path()).unwrap();
        assert_eq!(reopened.head().unwrap(), first);
        assert_eq!(reopened.commits().unwrap(), vec![first]);
        assert_eq!(
            svc.cached_workspaces().unwrap(),
            vec![ws1.path().to_path_buf(), ws3.path().to_path_buf()]
        );
        assert_eq!(svc.workspaces().unwrap().len(), 3);
    }

    #[test]
    fn cache_hit_promotes_workspace() {
        let stores = tempfile::tempdir().unwrap();
        let ws1 = tempfile::tempdir().unwrap();
        let ws2 = tempfile::tempdir().unwrap();
        let ws3 = tempfile::tempdir().unwrap();
        let svc = service(stores.path(), 2);

        svc.get_store(ws1.path()).unwrap();
        svc.get_store(ws2.path()).unwrap();
        svc.get_store(ws1.path()).unwrap();
        svc.get_store(ws3.path()).unwrap();

        assert_eq!(
            svc.cached_workspaces().unwrap(),
            vec![ws3.path().to_path_buf(), ws1.path().to_path_buf()]
        );
    }

    #[test]
    fn nested_stores_root_is_not_captured() {
        let ws = tempfile::tempdir().unwrap();
        let root = ws.path().join(".checkpoints");
        let svc = service(&root, 2);
        fs::write(ws.path().join("f.txt"), "x").unwrap();

        let store = svc.get_store(ws.path()).unwrap();
        let id = store.save(None).unwrap();
        assert_eq!(store.changed_files(id).unwrap(), vec!["f.txt"]);
        assert_eq!(store.save(None).unwrap(), id);
        assert!(store.status().unwrap().is_empty());
    }

    #[test]
    fn stray_directories_are_skipped() {
        let stores = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let svc = service(stores.path(), 2);
        svc.get_store(ws.path()).unwrap();

        fs::create_dir(stores.path().join("junk")).unwrap();
        fs::create_dir(stores.path().join("broken")).unwrap();
        fs::write(stores.path().join("broken/WORKSPACE"), "{").unwrap();
        fs::write(stores.path().join("file.txt"), "x").unwrap();

        assert_eq!(svc.workspaces().unwrap(), vec![ws.path().to_path_buf()]);
    }

    #[test]
    fn drop_store_removes_backing_directory() {
        let stores = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let svc = service(stores.path(), 2);

        fs::write(ws.path().join("f.txt"), "x").unwrap();
        let store = svc.get_store(ws.path()).unwrap();
        store.save(None).unwrap();
        let dir = store.store_dir().to_path_buf();

        assert!(svc.drop_store(ws.path()).unwrap());
        assert!(!dir.exists());
        assert!(svc.cached_workspaces().unwrap().is_empty());
        assert!(ws.path().join("f.txt").exists());
        assert!(!svc.drop_store(ws.path()).unwrap());

        let fresh = svc.get_store(ws.path()).unwrap();
        assert!(fresh.commits().unwrap().is_empty());
    }

    #[test]
    fn prune_removes_stores_of_vanished_workspaces() {
        let stores = tempfile::tempdir().unwrap();
        let keep = tempfile::tempdir().unwrap();
        let gone = tempfile::tempdir().unwrap();
        let svc = service(stores.path(), 4);

        svc.get_store(keep.path()).unwrap();
        svc.get_store(gone.path()).unwrap();
        let gone_path = gone.path().to_path_buf();
        drop(gone);

        assert_eq!(svc.prune().unwrap(), vec![gone_path]);
        assert_eq!(svc.workspaces().unwrap(), vec![keep.path().to_path_buf()]);
        assert_eq!(svc.cached_workspaces().unwrap(), vec![keep.path().to_path_buf()]);
        assert!(svc.prune().unwrap().is_empty());
    }

    #[test]
    fn with_config_applies_ignore_patterns() {
        let stores = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let config = CheckpointConfig {
            stores_root: stores.path().to_path_buf(),
            cache_size: 1,
            ignore: crate::config::IgnoreConfig {
                respect_gitignore: true,
                patterns: vec!["*.tmp".to_string()],
            },
        };
        let svc = CheckpointService::with_config(&config).unwrap();

        fs::write(ws.path().join("keep.txt"), "k").unwrap();
        fs::write(ws.path().join("scratch.tmp"), "t").unwrap();
        let store = svc.get_store(ws.path()).unwrap();
        let id = store.save(None).unwrap();
        assert_eq!(store.changed_files(id).unwrap(), vec!["keep.txt"]);
    }

    #[test]
    fn concurrent_get_store_opens_each_workspace_once() {
        let stores = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        let others: Vec<_> = (0..3).map(|_| tempfile::tempdir().unwrap()).collect();
        let svc = service(stores.path(), 2);

        let handles: Vec<CheckpointStore> = std::thread::scope(|scope| {
            let svc = &svc;
            let mut threads = Vec::new();
            for _ in 0..8 {
                let ws = shared.path();
                threads.push(scope.spawn(move || svc.get_store(ws).unwrap()));
            }
            for ws in &others {
                for _ in 0..2 {
                    let ws = ws.path();
                    threads.push(scope.spawn(move || svc.get_store(ws).unwrap()));
                }
            }
            threads.into_iter().map(|t| t.join().unwrap()).collect()
        });

        let shared_dirs: Vec<&Path> = handles[..8].iter().map(|h| h.store_dir()).collect();
        assert!(shared_dirs.iter().all(|d| *d == shared_dirs[0]));

        let dirs = fs::read_dir(svc.stores_root())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().is_dir())
            .count();
        assert_eq!(dirs, 4);
        assert_eq!(svc.workspaces().unwrap().len(), 4);
        assert!(svc.cached_workspaces().unwrap().len() <= 2);
    }
}
