//! Linear commit history for checkpoint stores.
//!
//! [`CommitGraph`] ties an object store to a HEAD pointer. Commits are only
//! ever appended; moving HEAD backwards leaves later commits in the store,
//! reachable by id.

pub mod error;
pub mod graph;

pub use error::{GraphError, GraphResult};
pub use graph::{Ancestry, CommitGraph};
