use std::fs;
use std::path::{Path, PathBuf};

use ckpt_worktree::IgnorePolicy;
use serde::{Deserialize, Serialize};

use crate::error::{CheckpointError, CheckpointResult};

pub const DEFAULT_CACHE_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Directory holding one store directory per workspace.
    pub stores_root: PathBuf,
    /// Number of open store handles the service keeps.
    pub cache_size: usize,
    pub ignore: IgnoreConfig,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            stores_root: default_stores_root(),
            cache_size: DEFAULT_CACHE_SIZE,
            ignore: IgnoreConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    pub respect_gitignore: bool,
    /// Extra gitignore-style patterns rooted at each workspace.
    pub patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            patterns: Vec::new(),
        }
    }
}

impl CheckpointConfig {
    /// Read a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> CheckpointResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| CheckpointError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
            .map_err(|e| CheckpointError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn ignore_policy(&self) -> IgnorePolicy {
        IgnorePolicy {
            respect_gitignore: self.ignore.respect_gitignore,
            patterns: self.ignore.patterns.clone(),
            excluded: Vec::new(),
        }
    }
}

/// `ckpt/stores` under the platform data directory, or under the temp
/// directory when the platform has none.
pub fn default_stores_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ckpt")
        .join("stores")
}
