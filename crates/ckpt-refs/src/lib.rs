//! HEAD pointer storage for checkpoint stores.
//!
//! Each workspace store has exactly one mutable reference, HEAD, naming its
//! most recent commit. Everything else in a store is immutable and
//! content-addressed, so HEAD is the only piece of state that needs atomic
//! replacement.
//!
//! # Modules
//!
//! - [`error`]: Error types for HEAD operations
//! - [`traits`]: The [`HeadStore`] trait
//! - [`memory`]: In-memory [`InMemoryHeadStore`] for tests
//! - [`file`]: [`FileHeadStore`], an atomically replaced `HEAD` file

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{RefError, Result};
pub use file::FileHeadStore;
pub use memory::InMemoryHeadStore;
pub use traits::HeadStore;
