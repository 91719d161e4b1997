//! Content hashing for the checkpoint store.
//!
//! Provides domain-separated BLAKE3 hashing so that blobs, trees and commits
//! live in disjoint identifier spaces. No custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
