//! One file per record.

use crate::config::BodyFormat;
use crate::error::{CoreError, CoreResult};
use crate::record::traits::Record;
use crate::types::RecordId;
use filedb_storage::{StorageBackend, StorageError};
use std::marker::PhantomData;
use std::sync::Arc;

/// Durable storage of record bodies, keyed by [`RecordId`].
///
/// Each record lives in `<id>.rec`. Writes go through the backend's atomic
/// replace, so a concurrent [`RecordStore::get`] sees either the previous
/// body or the new one.
///
/// The store does not lock: callers serialize writers of the same ID.
pub struct RecordStore<T: Record> {
    backend: Arc<dyn StorageBackend>,
    format: BodyFormat,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> RecordStore<T> {
    /// Creates a record store over `backend`.
    pub fn new(backend: Arc<dyn StorageBackend>, format: BodyFormat) -> Self {
        Self {
            backend,
            format,
            _marker: PhantomData,
        }
    }

    /// Returns the body format.
    pub fn format(&self) -> BodyFormat {
        self.format
    }

    /// Writes `record` as the body of `id`, replacing any previous body.
    pub fn put(&self, id: RecordId, record: &T) -> CoreResult<()> {
        let bytes = self.format.encode(record)?;
        self.backend.write_atomic(&id.file_name(), &bytes)?;
        Ok(())
    }

    /// Reads the body of `id`.
    ///
    /// The returned record's ID is set from the file name.
    pub fn get(&self, id: RecordId) -> CoreResult<T> {
        let bytes = self.backend.read(&id.file_name()).map_err(|e| not_found(e, id))?;
        let mut record: T = self.format.decode(id, &bytes)?;
        record.set_id(id);
        Ok(record)
    }

    /// Removes the body of `id`.
    pub fn remove(&self, id: RecordId) -> CoreResult<()> {
        self.backend
            .remove(&id.file_name())
            .map_err(|e| not_found(e, id))
    }

    /// Returns true if a body exists for `id`.
    pub fn exists(&self, id: RecordId) -> CoreResult<bool> {
        Ok(self.backend.exists(&id.file_name())?)
    }

    /// Lists the IDs of every record on disk, ascending.
    pub fn ids(&self) -> CoreResult<Vec<RecordId>> {
        let mut ids: Vec<RecordId> = self
            .backend
            .list()?
            .iter()
            .filter_map(|name| RecordId::from_file_name(name))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Lazily reads every record, ascending by ID.
    ///
    /// The set of IDs is fixed when this is called. Records removed before
    /// the iterator reaches them are skipped. Call again to restart.
    ///
    /// **Warning**: This is a full scan. Prefer index lookups.
    pub fn scan_all(&self) -> CoreResult<ScanAll<'_, T>> {
        Ok(ScanAll {
            store: self,
            ids: self.ids()?.into_iter(),
        })
    }
}

fn not_found(err: StorageError, id: RecordId) -> CoreError {
    if err.is_not_found() {
        CoreError::NotFound { id }
    } else {
        err.into()
    }
}

/// Iterator returned by [`RecordStore::scan_all`].
pub struct ScanAll<'a, T: Record> {
    store: &'a RecordStore<T>,
    ids: std::vec::IntoIter<RecordId>,
}

impl<T: Record> Iterator for ScanAll<'_, T> {
    type Item = CoreResult<(RecordId, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.ids.next()?;
            match self.store.get(id) {
                Ok(record) => return Some(Ok((id, record))),
                Err(CoreError::NotFound { .. }) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len()))
    }
}
