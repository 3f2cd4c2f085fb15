//! Store directory management.
//!
//! A store is one directory:
//!
//! ```text
//! <store>/
//! ├─ counter            # next id, live count
//! ├─ <id>.rec           # one body per record
//! ├─ idx_<field>.idx    # one side file per index
//! └─ LOCK               # advisory lock, only with Config::exclusive
//! ```

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use filedb_storage::FileBackend;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const LOCK_FILE: &str = "LOCK";

/// An opened store directory.
///
/// With [`Config::exclusive`] the directory's `LOCK` file is held for the
/// lifetime of this value, so a second process cannot open the same store.
/// Threads of one process are coordinated by the lock manager instead.
#[derive(Debug)]
pub(crate) struct StoreDir {
    path: PathBuf,
    backend: Arc<FileBackend>,
    _lock_file: Option<File>,
}

impl StoreDir {
    /// Opens or creates a store directory.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidConfig`] if the directory is missing and
    ///   `create_if_missing` is off, or the path is not a directory
    /// - [`CoreError::StoreLocked`] if another process holds the lock
    pub(crate) fn open(path: &Path, config: &Config) -> CoreResult<Self> {
        if !path.exists() {
            if config.create_if_missing {
                fs::create_dir_all(path)?;
                debug!(path = %path.display(), "created store directory");
            } else {
                return Err(CoreError::invalid_config(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }
        if !path.is_dir() {
            return Err(CoreError::invalid_config(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = if config.exclusive {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path.join(LOCK_FILE))?;
            if file.try_lock_exclusive().is_err() {
                return Err(CoreError::StoreLocked);
            }
            Some(file)
        } else {
            None
        };

        let backend = FileBackend::open(path)?.with_sync(config.sync_writes);
        Ok(Self {
            path: backend.path().to_path_buf(),
            backend: Arc::new(backend),
            _lock_file: lock_file,
        })
    }

    /// Returns the canonical store path.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file backend rooted at the store directory.
    pub(crate) fn backend(&self) -> Arc<FileBackend> {
        Arc::clone(&self.backend)
    }
}
