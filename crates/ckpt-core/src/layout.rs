//! On-disk layout of a store directory under the stores root.
//!
//! ```text
//! <stores_root>/<dirname>_<16 hex>/
//!   WORKSPACE   JSON workspace record
//!   HEAD        current commit id
//!   objects/    loose objects
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use ckpt_crypto::ContentHasher;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{CheckpointError, CheckpointResult};

pub const WORKSPACE_FILE: &str = "WORKSPACE";
pub const HEAD_FILE: &str = "HEAD";
pub const OBJECTS_DIR: &str = "objects";

/// Version written into every new workspace record.
pub const FORMAT_VERSION: u32 = 1;

const KEY_HEX_LEN: usize = 16;

/// Name of the store directory for an absolute workspace path.
///
/// The readable prefix is the workspace's last component with anything
/// outside `[A-Za-z0-9._-]` replaced by `_`; the suffix keys the full path.
pub fn store_dir_name(workspace: &Path) -> String {
    let label: String = workspace
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "root".to_string())
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let key = ContentHasher::WORKSPACE
        .hash(workspace.as_os_str().as_encoded_bytes())
        .to_hex();
    format!("{label}_{}", &key[..KEY_HEX_LEN])
}

/// Paths inside one store directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreLayout {
    dir: PathBuf,
}

impl StoreLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn workspace_file(&self) -> PathBuf {
        self.dir.join(WORKSPACE_FILE)
    }

    pub fn head_file(&self) -> PathBuf {
        self.dir.join(HEAD_FILE)
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.dir.join(OBJECTS_DIR)
    }
}

/// Identifies which workspace a store directory belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    pub format: u32,
    pub workspace: PathBuf,
    pub created_at_ms: u64,
}

impl WorkspaceRecord {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            format: FORMAT_VERSION,
            workspace: workspace.into(),
            created_at_ms,
        }
    }

    /// Read the record of a store directory; `None` if it has none.
    pub fn load(layout: &StoreLayout) -> CheckpointResult<Option<Self>> {
        let path = layout.workspace_file();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CheckpointError::StoreUnavailable(format!(
                    "{}: {e}",
                    path.display()
                )))
            }
        };
        let record: Self = serde_json::from_slice(&bytes).map_err(|e| {
            CheckpointError::StoreUnavailable(format!("{}: {e}", path.display()))
        })?;
        if record.format > FORMAT_VERSION {
            return Err(CheckpointError::StoreUnavailable(format!(
                "{}: unsupported format {}",
                path.display(),
                record.format
            )));
        }
        Ok(Some(record))
    }

    /// Write the record atomically.
    pub fn save(&self, layout: &StoreLayout) -> CheckpointResult<()> {
        let unavailable =
            |e: io::Error| CheckpointError::StoreUnavailable(format!("{}: {e}", layout.dir().display()));
        fs::create_dir_all(layout.dir()).map_err(unavailable)?;
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| CheckpointError::StoreUnavailable(e.to_string()))?;
        let mut tmp = NamedTempFile::new_in(layout.dir()).map_err(unavailable)?;
        tmp.write_all(&json).map_err(unavailable)?;
        tmp.as_file().sync_all().map_err(unavailable)?;
        tmp.persist(layout.workspace_file())
            .map_err(|e| unavailable(e.error))?;
        Ok(())
    }
}
