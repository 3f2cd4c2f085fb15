//! # filedb Storage
//!
//! Storage backend trait and implementations for filedb.
//!
//! A backend is a flat namespace of **named blobs** (one directory on disk).
//! It does not interpret the bytes it stores: record bodies, index side
//! files and the counter file are all just names to it.
//!
//! ## Design Principles
//!
//! - Whole-blob replacement is atomic: readers observe the old or the new
//!   content, never a prefix of either
//! - Appends are the only in-place mutation
//! - Must be `Send + Sync` for concurrent access
//! - The engine owns all format interpretation
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - One file per name inside a directory
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//!
//! ## Example
//!
//! ```rust
//! use filedb_storage::{StorageBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.write_atomic("1.rec", b"{}").unwrap();
//! assert_eq!(backend.read("1.rec").unwrap(), b"{}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
