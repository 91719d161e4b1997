//! Diff engine for checkpoint stores.
//!
//! # Key Types
//!
//! - [`TreeDiff`] / [`TreeChange`] -- changed files between two trees or snapshots
//! - [`BlobDiff`] / [`DiffHunk`] / [`DiffLine`] -- line-level blob diff
//! - [`render_patch`] -- git-style unified patch text for one file

pub mod blob_diff;
pub mod error;
pub mod patch;
pub mod tree_diff;

pub use blob_diff::{diff_blobs, BlobDiff, DiffHunk, DiffLine};
pub use error::{DiffError, DiffResult};
pub use patch::{render_patch, FileVersion};
pub use tree_diff::{diff_snapshots, diff_trees, ChangeKind, TreeChange, TreeDiff};
