//! The [`HeadStore`] trait defining how a store's HEAD pointer is kept.

use ckpt_types::ObjectId;

use crate::error::Result;

/// Storage backend for a single HEAD pointer.
///
/// HEAD names the most recent commit of a workspace. Implementations must be
/// thread-safe and make `set_head` atomic: a concurrent or later reader sees
/// either the old or the new value, never a mix.
pub trait HeadStore: Send + Sync {
    /// Read the current HEAD.
    ///
    /// Returns `Ok(None)` if nothing has been committed yet.
    fn head(&self) -> Result<Option<ObjectId>>;

    /// Point HEAD at `commit`.
    fn set_head(&self, commit: &ObjectId) -> Result<()>;

    /// Unset HEAD. Returns `true` if it was set.
    fn clear(&self) -> Result<bool>;
}
