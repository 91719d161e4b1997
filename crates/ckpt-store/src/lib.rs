//! Content-addressed object storage for workspace checkpoints.
//!
//! Every piece of checkpoint data is an immutable object identified by its
//! BLAKE3 hash, domain-separated by object kind:
//!
//! - [`Blob`] -- raw file contents or a symlink target
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- root tree + parent + message + timestamp
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`LooseObjectStore`] -- one zstd-compressed file per object on disk
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding

pub mod error;
pub mod loose;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use loose::LooseObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
