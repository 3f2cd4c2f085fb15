//! # filedb Core
//!
//! Embedded document store that maps typed records onto plain files.
//!
//! This crate provides:
//! - A persistent ID allocator (`counter` file, atomic replace)
//! - A process-wide keyed lock manager
//! - A record store with one file per record (`<id>.rec`)
//! - Covering secondary indexes with uniqueness enforcement and
//!   self-repair (`idx_<field>.idx`)
//! - The [`Store`] facade composing all of the above
//!
//! ## Example
//!
//! ```rust,ignore
//! use filedb_core::{Config, IndexConfig, Store};
//!
//! let users: Store<User> = Store::open(
//!     Path::new("data/users"),
//!     vec![IndexConfig::new("UserName").unique(), IndexConfig::new("Email").unique()],
//!     Config::default(),
//! )?;
//! users.init()?;
//!
//! let mut alice = User::new("alice", "a@x.com");
//! let id = users.insert(&mut alice)?;
//! assert_eq!(users.list("UserName", "alice")?, vec![alice]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod counter;
mod dir;
mod error;
mod index;
mod lock;
mod record;
mod stats;
mod store;
mod types;

pub use config::{BodyFormat, Config};
pub use counter::{Counter, IdAllocator};
pub use error::{CoreError, CoreResult};
pub use index::{FieldIndex, IndexConfig, IndexEntry, IndexProblem, IndexReport, VerifyReport};
pub use lock::{LockGuard, LockManager};
pub use record::{DynamicRecord, Identify, Project, Record, RecordStore, ScanAll};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::Store;
pub use types::RecordId;

pub use filedb_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
