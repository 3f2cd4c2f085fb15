//! File-based storage backend for persistent storage.

use crate::backend::{validate_name, StorageBackend, TEMP_MARKER};
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A directory-based storage backend.
///
/// Every blob is one file directly inside the root directory. Data survives
/// process restarts.
///
/// # Durability
///
/// - `write_atomic` writes a uniquely named temporary file, then renames it
///   over the target
/// - With `sync` enabled the temporary file is `sync_all`ed before the
///   rename and the directory is synced after it, so a crash leaves either
///   the old or the new content on disk
///
/// # Thread Safety
///
/// This backend holds no mutable state and can be shared across threads.
/// Concurrent `write_atomic` calls on the same name never share a temporary
/// file; the last rename wins.
///
/// # Example
///
/// ```no_run
/// use filedb_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open_with_create_dirs(Path::new("data/users")).unwrap();
/// backend.write_atomic("counter", b"1\n0\n").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    location: String,
    sync: bool,
}

impl FileBackend {
    /// Opens an existing directory as a backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or is not a directory.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let meta = fs::metadata(path)?;
        if !meta.is_dir() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {}", path.display()),
            )));
        }

        let canonical = fs::canonicalize(path)?;
        Ok(Self {
            location: canonical.display().to_string(),
            root: canonical,
            sync: true,
        })
    }

    /// Opens a directory as a backend, creating it and its parents if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        fs::create_dir_all(path)?;
        Self::open(path)
    }

    /// Sets whether writes are fsynced before they are published.
    #[must_use]
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Syncs the directory so that renames and removals are durable.
    ///
    /// Windows NTFS journals metadata, so there is nothing to do there.
    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        if self.sync {
            File::open(&self.root)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }
}

fn map_not_found(err: io::Error, name: &str) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::not_found(name)
    } else {
        StorageError::Io(err)
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.blob_path(name)?;
        fs::read(&path).map_err(|e| map_not_found(e, name))
    }

    fn write_atomic(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let target = self.blob_path(name)?;
        let temp = self
            .root
            .join(format!("{name}{TEMP_MARKER}{}", Uuid::new_v4().simple()));

        let written = (|| -> io::Result<()> {
            let mut file = File::create(&temp)?;
            file.write_all(data)?;
            if self.sync {
                file.sync_all()?;
            }
            drop(file);
            fs::rename(&temp, &target)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        self.sync_directory()
    }

    fn append(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.blob_path(name)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(data)?;
        if self.sync {
            file.sync_data()?;
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> StorageResult<()> {
        let path = self.blob_path(name)?;
        fs::remove_file(&path).map_err(|e| map_not_found(e, name))?;
        self.sync_directory()
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.blob_path(name)?;
        Ok(path.try_exists()?)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            // Non UTF-8 names cannot have been written by us.
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.contains(TEMP_MARKER) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}
