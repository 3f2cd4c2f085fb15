//! CLI command implementations.

pub mod find;
pub mod inspect;
pub mod list;
pub mod reindex;
pub mod verify;

use filedb_core::{BodyFormat, Config, CoreResult, DynamicRecord, IndexConfig, Store};
use std::path::PathBuf;
use tracing::debug;

/// The store a command operates on.
pub struct Target {
    /// Store directory.
    pub path: PathBuf,
    /// Declared indexes, in order.
    pub indexes: Vec<IndexConfig>,
    /// Record body format.
    pub format: BodyFormat,
}

impl Target {
    /// Opens the existing store without initializing it.
    pub fn open(&self) -> CoreResult<Store<DynamicRecord>> {
        let config = Config::default()
            .create_if_missing(false)
            .body_format(self.format);
        debug!(path = ?self.path, indexes = self.indexes.len(), format = %self.format, "opening store");
        Store::open(&self.path, self.indexes.clone(), config)
    }
}
