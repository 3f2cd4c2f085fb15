//! Covering secondary indexes.
//!
//! Each configured [`IndexConfig`] owns one side file, `idx_<field>.idx`,
//! holding one tab-separated line per record:
//!
//! ```text
//! value \t id \t included1 \t included2 ... \n
//! ```
//!
//! Indexes are derived data. The record files are the source of truth, and
//! any side file can be deleted and rebuilt from them at any time.

mod config;
mod entry;
mod field;
mod verify;

pub use config::IndexConfig;
pub use entry::IndexEntry;
pub use field::FieldIndex;
pub use verify::{IndexProblem, IndexReport, VerifyReport};
