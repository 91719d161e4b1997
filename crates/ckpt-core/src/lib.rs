//! Per-workspace checkpoint stores.
//!
//! A [`CheckpointService`] owns a directory of stores, one per workspace,
//! and hands out [`CheckpointStore`] handles from a bounded LRU cache. A
//! store snapshots its workspace into content-addressed commits (`save`),
//! reports what changed (`get_changed_files`, `get_file_diff`, `status`) and
//! restores earlier states (`reset`, `rollback`). Stores live outside the
//! workspace and never touch a `.git` directory inside it.
//!
//! ```no_run
//! use ckpt_core::CheckpointService;
//!
//! # fn main() -> ckpt_core::CheckpointResult<()> {
//! let service = CheckpointService::new("/var/lib/ckpt", None)?;
//! let store = service.get_store("/work/project")?;
//! let first = store.save(Some("before refactor"))?;
//! // ... edit files ...
//! store.save(Some("after refactor"))?;
//! store.reset(first)?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod layout;
pub mod reference;
pub mod service;
pub mod store;
pub mod summary;

pub use config::{default_stores_root, CheckpointConfig, IgnoreConfig, DEFAULT_CACHE_SIZE};
pub use error::{CheckpointError, CheckpointResult};
pub use reference::{parse_commit_id, IntoCommitId};
pub use service::CheckpointService;
pub use store::CheckpointStore;
pub use summary::{CommitSummary, FileStatus};

pub use ckpt_diff::ChangeKind;
pub use ckpt_types::ObjectId;
