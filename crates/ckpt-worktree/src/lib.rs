//! Working-tree support for checkpoint stores.
//!
//! Scans a workspace directory into a flat [`Snapshot`], turns snapshots into
//! nested [`Tree`](ckpt_store::Tree) objects and back, and materializes a
//! snapshot over the live workspace.
//!
//! # Key Types
//!
//! - [`Scanner`] -- walks the workspace under an [`IgnorePolicy`]
//! - [`Snapshot`] -- sorted `path → (mode, blob id)` map
//! - [`Checkout`] -- applies a snapshot to disk

pub mod checkout;
pub mod error;
pub mod path;
pub mod scanner;
pub mod snapshot;
pub mod tree;

pub use checkout::{Checkout, CheckoutReport};
pub use error::{WorktreeError, WorktreeResult};
pub use path::normalize_path;
pub use scanner::{IgnorePolicy, Scanner};
pub use snapshot::{Snapshot, SnapshotEntry};
pub use tree::{build_tree, flatten_tree, lookup_path};
