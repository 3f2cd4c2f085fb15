//! Storage backend trait definition.

use crate::error::{StorageError, StorageResult};

/// A low-level storage backend for filedb.
///
/// Storage backends are **opaque named-blob stores**. They provide simple
/// operations for reading, replacing, appending and removing blobs.
/// The engine owns all format interpretation - backends do not understand
/// records, index lines or counters.
///
/// # Invariants
///
/// - `write_atomic` publishes the full content or nothing; a concurrent
///   `read` returns either the previous or the new bytes
/// - `append` never rewrites existing bytes
/// - `list` reflects a point-in-time listing and never returns temporary
///   files produced by in-flight `write_atomic` calls
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::FileBackend`] - For persistent storage
/// - [`super::InMemoryBackend`] - For testing
pub trait StorageBackend: Send + Sync {
    /// Reads the full content of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the blob does not exist, or an
    /// I/O error.
    fn read(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Replaces the content of `name` atomically, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs. On error the previous
    /// content is left untouched.
    fn write_atomic(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    /// Appends `data` to `name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    /// Removes `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the blob does not exist.
    fn remove(&self, name: &str) -> StorageResult<()>;

    /// Returns true if `name` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Lists every blob name currently published.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Returns a stable identifier of the underlying location.
    ///
    /// Two backends that share storage return the same location; it is
    /// used to derive process-wide lock keys.
    fn location(&self) -> String;
}

/// Suffix marker of temporary files written by `write_atomic`.
pub(crate) const TEMP_MARKER: &str = ".tmp-";

/// Rejects names that would escape the backend's namespace.
pub(crate) fn validate_name(name: &str) -> StorageResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.contains(TEMP_MARKER);
    if bad {
        return Err(StorageError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
