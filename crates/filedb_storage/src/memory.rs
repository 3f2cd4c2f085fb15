//! In-memory storage backend for testing.

use crate::backend::{validate_name, StorageBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use uuid::Uuid;

/// An in-memory storage backend.
///
/// This backend stores all blobs in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// Writes to selected names can be made to fail, which lets tests exercise
/// rollback paths without a real full disk.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use filedb_storage::{StorageBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.append("idx_Url.idx", b"/home\t1\n").unwrap();
/// assert_eq!(backend.list().unwrap(), vec!["idx_Url.idx".to_string()]);
/// ```
#[derive(Debug)]
pub struct InMemoryBackend {
    location: String,
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
    failing: RwLock<BTreeSet<String>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            location: format!("memory:{}", Uuid::new_v4()),
            blobs: RwLock::new(BTreeMap::new()),
            failing: RwLock::new(BTreeSet::new()),
        }
    }
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write or append to `name` fail with an I/O error.
    pub fn fail_writes_to(&self, name: impl Into<String>) {
        self.failing.write().insert(name.into());
    }

    /// Clears all injected write failures.
    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    /// Returns the number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if no blobs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    fn check_writable(&self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        if self.failing.read().contains(name) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("injected write failure for {name}"),
            )));
        }
        Ok(())
    }
}

impl StorageBackend for InMemoryBackend {
    fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        validate_name(name)?;
        self.blobs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(name))
    }

    fn write_atomic(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        self.check_writable(name)?;
        self.blobs.write().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn append(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        self.check_writable(name)?;
        self.blobs
            .write()
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn remove(&self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        match self.blobs.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(StorageError::not_found(name)),
        }
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        validate_name(name)?;
        Ok(self.blobs.read().contains_key(name))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self.blobs.read().keys().cloned().collect())
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}
