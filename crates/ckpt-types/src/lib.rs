//! Foundation types for the checkpoint store.
//!
//! Every other `ckpt` crate depends on `ckpt-types` for the [`ObjectId`]
//! that names blobs, trees and commits.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (BLAKE3 hash)
//! - [`TypeError`]: Parse failures for identifiers

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::ObjectId;
