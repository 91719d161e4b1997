//! In-memory HEAD for tests and ephemeral stores.

use std::sync::RwLock;

use ckpt_types::ObjectId;

use crate::error::{RefError, Result};
use crate::traits::HeadStore;

/// An in-memory implementation of [`HeadStore`].
#[derive(Debug, Default)]
pub struct InMemoryHeadStore {
    head: RwLock<Option<ObjectId>>,
}

impl InMemoryHeadStore {
    /// Create a store with HEAD unset.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> RefError {
    RefError::Poisoned(e.to_string())
}

impl HeadStore for InMemoryHeadStore {
    fn head(&self) -> Result<Option<ObjectId>> {
        Ok(*self.head.read().map_err(poisoned)?)
    }

    fn set_head(&self, commit: &ObjectId) -> Result<()> {
        *self.head.write().map_err(poisoned)? = Some(*commit);
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        Ok(self.head.write().map_err(poisoned)?.take().is_some())
    }
}
