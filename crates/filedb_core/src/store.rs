//! The store facade.

use crate::config::Config;
use crate::counter::{Counter, IdAllocator};
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::index::{FieldIndex, IndexConfig, IndexEntry, VerifyReport};
use crate::lock::LockManager;
use crate::record::{Record, RecordStore};
use crate::stats::StoreStats;
use crate::types::RecordId;
use filedb_storage::{InMemoryBackend, StorageBackend};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Placeholder ID used while projections are checked ahead of allocation.
const UNASSIGNED: RecordId = RecordId::new(0);

/// A typed document store backed by one directory.
///
/// `Store` composes the ID allocator, the record store and one
/// [`FieldIndex`] per configured [`IndexConfig`]. It is `Send + Sync`; share
/// it behind an `Arc` and call it from any number of threads.
///
/// # Locking
///
/// Every write holds the record's lock key for its full duration, then
/// takes index keys one at a time and the counter key last. Reads take no
/// lock.
///
/// # Failure atomicity
///
/// A failed insert, update or delete undoes what it already wrote before
/// returning the error. IDs are never reused, so a failed insert still
/// consumes one.
///
/// # Example
///
/// ```rust,ignore
/// use filedb_core::{Config, IndexConfig, Store};
///
/// let pages: Store<Page> = Store::open(
///     Path::new("data/pages"),
///     vec![
///         IndexConfig::new("Url").unique(),
///         IndexConfig::new("ParentID").include(["Url", "Title"]),
///     ],
///     Config::default(),
/// )?;
/// pages.init()?;
///
/// let children = pages.list_projected("ParentID", "1")?;
/// ```
pub struct Store<T: Record> {
    config: Config,
    /// Holds the directory's advisory lock. None for in-memory stores.
    dir: Option<StoreDir>,
    location: String,
    locks: Arc<LockManager>,
    allocator: IdAllocator,
    records: RecordStore<T>,
    indexes: Vec<FieldIndex>,
    stats: StoreStats,
}

impl<T: Record> Store<T> {
    /// Opens the store in the directory `path`.
    ///
    /// Opening writes no store data. It may create the directory
    /// (`create_if_missing`) and the `LOCK` file (`exclusive`). Call
    /// [`Store::init`] before the first operation.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidConfig`] for an invalid index list, or a
    ///   missing directory when `create_if_missing` is off
    /// - [`CoreError::StoreLocked`] if `exclusive` is set and another
    ///   process holds the store
    pub fn open(path: &Path, indexes: Vec<IndexConfig>, config: Config) -> CoreResult<Self> {
        IndexConfig::validate_all(&indexes)?;
        let dir = StoreDir::open(path, &config)?;
        let backend: Arc<dyn StorageBackend> = dir.backend();
        Ok(Self::assemble(backend, Some(dir), indexes, config))
    }

    /// Opens a store over an existing backend.
    ///
    /// Lower-level constructor for tests and embedders that supply their
    /// own storage. `create_if_missing` and `exclusive` do not apply.
    pub fn open_with_backend(
        backend: Arc<dyn StorageBackend>,
        indexes: Vec<IndexConfig>,
        config: Config,
    ) -> CoreResult<Self> {
        IndexConfig::validate_all(&indexes)?;
        Ok(Self::assemble(backend, None, indexes, config))
    }

    /// Opens and initializes a fresh in-memory store.
    pub fn open_in_memory(indexes: Vec<IndexConfig>) -> CoreResult<Self> {
        let store = Self::open_with_backend(Arc::new(InMemoryBackend::new()), indexes, Config::default())?;
        store.init()?;
        Ok(store)
    }

    fn assemble(
        backend: Arc<dyn StorageBackend>,
        dir: Option<StoreDir>,
        indexes: Vec<IndexConfig>,
        config: Config,
    ) -> Self {
        let locks = LockManager::global();
        let indexes = indexes
            .into_iter()
            .map(|c| FieldIndex::new(Arc::clone(&backend), Arc::clone(&locks), c))
            .collect();
        Self {
            location: backend.location(),
            allocator: IdAllocator::new(Arc::clone(&backend), Arc::clone(&locks)),
            records: RecordStore::new(backend, config.body_format),
            dir,
            locks,
            indexes,
            config,
            stats: StoreStats::new(),
        }
    }

    /// Makes the store ready for use.
    ///
    /// Creates the counter if it is missing and builds every index whose
    /// side file is missing. A counter lost while records remain is
    /// recreated from the records, so IDs already on disk are never issued
    /// again. Safe to call any number of times.
    pub fn init(&self) -> CoreResult<()> {
        if !self.allocator.exists()? {
            let ids = self.records.ids()?;
            let counter = Counter {
                next_id: ids.last().map_or(1, |id| id.as_u64() + 1),
                count: ids.len() as u64,
            };
            if !ids.is_empty() {
                warn!(
                    store = %self.location,
                    next_id = counter.next_id,
                    count = counter.count,
                    "counter missing, recreating it from the records"
                );
            }
            self.allocator.initialize_with(counter)?;
        }

        for index in &self.indexes {
            if index.ensure_built(&self.records)? {
                self.stats.record_index_rebuild();
            }
        }
        debug!(store = %self.location, indexes = self.indexes.len(), "store initialized");
        Ok(())
    }

    /// Inserts a new record and assigns its ID.
    ///
    /// Every index value is checked before anything is written.
    ///
    /// # Errors
    ///
    /// - [`CoreError::IdAlreadyAssigned`] if `record` already has an ID
    /// - [`CoreError::InvalidKey`] / [`CoreError::UnknownField`] for a
    ///   value that cannot be indexed
    /// - [`CoreError::DuplicateKey`] if a unique index already holds one of
    ///   the record's values
    ///
    /// On error `record` is left without an ID and the store is unchanged
    /// apart from the consumed ID.
    pub fn insert(&self, record: &mut T) -> CoreResult<RecordId> {
        if let Some(id) = record.id() {
            return Err(CoreError::IdAlreadyAssigned { id });
        }
        let result = self.insert_new(record);
        self.tally(&result, StoreStats::record_insert);
        result
    }

    fn insert_new(&self, record: &mut T) -> CoreResult<RecordId> {
        let mut entries = self.project_all(UNASSIGNED, record)?;
        let id = self.allocator.next_id()?;
        for entry in &mut entries {
            entry.id = id;
        }

        let _guard = self.locks.acquire(&self.record_key(id));
        if self.records.exists(id)? {
            warn!(store = %self.location, %id, "counter is behind the records; reindex to repair");
            return Err(CoreError::corrupt_counter(format!(
                "issued id {id} already belongs to a record"
            )));
        }
        record.set_id(id);
        if let Err(e) = self.write_new(id, record, &entries) {
            record.clear_id();
            return Err(e);
        }

        if let Err(e) = self.allocator.record_inserted() {
            warn!(store = %self.location, %id, error = %e, "record count not updated; reindex to repair");
        }
        debug!(store = %self.location, %id, "record inserted");
        Ok(id)
    }

    fn write_new(&self, id: RecordId, record: &T, entries: &[IndexEntry]) -> CoreResult<()> {
        self.records.put(id, record)?;
        for (index, entry) in self.indexes.iter().zip(entries) {
            if let Err(e) = self.repairing(index, |index| index.add(entry)) {
                warn!(store = %self.location, %id, field = index.field(), error = %e, "insert failed, rolling back");
                self.rollback_insert(id);
                return Err(e);
            }
        }
        Ok(())
    }

    fn rollback_insert(&self, id: RecordId) {
        self.stats.record_rollback();
        // All indexes: a concurrent rebuild may have picked up the new body.
        for index in &self.indexes {
            if let Err(e) = index.remove(id) {
                warn!(store = %self.location, %id, field = index.field(), error = %e, "rollback left an index entry behind");
            }
        }
        if let Err(e) = self.records.remove(id) {
            if !e.is_not_found() {
                warn!(store = %self.location, %id, error = %e, "rollback left the record body behind");
            }
        }
    }

    /// Rewrites an existing record and all of its index entries.
    ///
    /// Unique indexes are enforced exactly as on insert. On error the
    /// previous body and index entries are restored.
    ///
    /// # Errors
    ///
    /// - [`CoreError::MissingId`] if `record` has no ID
    /// - [`CoreError::NotFound`] if no record has that ID
    /// - [`CoreError::DuplicateKey`], [`CoreError::InvalidKey`] as for insert
    pub fn update(&self, record: &T) -> CoreResult<()> {
        let result = self.update_existing(record);
        self.tally(&result, StoreStats::record_update);
        result
    }

    fn update_existing(&self, record: &T) -> CoreResult<()> {
        let id = record.id().ok_or(CoreError::MissingId)?;
        let entries = self.project_all(id, record)?;

        let _guard = self.locks.acquire(&self.record_key(id));
        let previous = self.previous_body(id)?;
        self.records.put(id, record)?;

        for (index, entry) in self.indexes.iter().zip(&entries) {
            if let Err(e) = self.repairing(index, |index| index.update(entry)) {
                warn!(store = %self.location, %id, field = index.field(), error = %e, "update failed, rolling back");
                self.restore(id, previous.as_ref());
                return Err(e);
            }
        }
        debug!(store = %self.location, %id, "record updated");
        Ok(())
    }

    /// Deletes a record and all of its index entries.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if no record has that ID.
    pub fn delete(&self, id: RecordId) -> CoreResult<()> {
        let result = self.delete_existing(id);
        self.tally(&result, StoreStats::record_delete);
        result
    }

    fn delete_existing(&self, id: RecordId) -> CoreResult<()> {
        let _guard = self.locks.acquire(&self.record_key(id));
        let previous = self.previous_body(id)?;
        self.records.remove(id)?;

        for index in &self.indexes {
            if let Err(e) = self.repairing(index, |index| index.remove(id)) {
                warn!(store = %self.location, %id, field = index.field(), error = %e, "delete failed, rolling back");
                self.restore(id, previous.as_ref());
                return Err(e);
            }
        }

        if let Err(e) = self.allocator.record_deleted() {
            warn!(store = %self.location, %id, error = %e, "record count not updated; reindex to repair");
        }
        debug!(store = %self.location, %id, "record deleted");
        Ok(())
    }

    /// Loads the body a failed write can fall back to.
    ///
    /// A body that no longer decodes is not worth restoring; the write may
    /// replace it.
    fn previous_body(&self, id: RecordId) -> CoreResult<Option<T>> {
        match self.records.get(id) {
            Ok(record) => Ok(Some(record)),
            Err(CoreError::CorruptRecord { message, .. }) => {
                warn!(store = %self.location, %id, %message, "overwriting a corrupt record body");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn restore(&self, id: RecordId, previous: Option<&T>) {
        self.stats.record_rollback();
        let Some(previous) = previous else {
            warn!(store = %self.location, %id, "no readable previous body; reindex to repair");
            return;
        };

        if let Err(e) = self.records.put(id, previous) {
            warn!(store = %self.location, %id, error = %e, "rollback could not restore the record body");
            return;
        }
        for index in &self.indexes {
            let restored = index
                .entry_for(id, previous)
                .and_then(|entry| index.update(&entry));
            if let Err(e) = restored {
                warn!(store = %self.location, %id, field = index.field(), error = %e, "rollback could not restore an index entry");
            }
        }
    }

    /// Loads a record by ID.
    pub fn find(&self, id: RecordId) -> CoreResult<T> {
        self.stats.record_read();
        self.records.get(id)
    }

    /// Returns true if a record with `id` exists.
    pub fn exists(&self, id: RecordId) -> CoreResult<bool> {
        self.records.exists(id)
    }

    /// Loads every record whose `field` equals `value`.
    ///
    /// Entries whose record disappears between the index lookup and the
    /// load are skipped.
    pub fn list(&self, field: &str, value: &str) -> CoreResult<Vec<T>> {
        let entries = self.list_projected(field, value)?;
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.find(entry.id) {
                Ok(record) => records.push(record),
                Err(e) if e.is_not_found() => {
                    debug!(store = %self.location, id = %entry.id, field, "indexed record vanished");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// Returns the index entries whose `field` equals `value`.
    ///
    /// Answered from the side file alone; no record body is read.
    pub fn list_projected(&self, field: &str, value: &str) -> CoreResult<Vec<IndexEntry>> {
        let index = self.index(field)?;
        self.stats.record_index_lookup();
        self.repairing(index, |index| index.lookup(value))
    }

    /// Returns every entry of the index on `field`.
    pub fn list_all_projected(&self, field: &str) -> CoreResult<Vec<IndexEntry>> {
        let index = self.index(field)?;
        self.stats.record_index_lookup();
        self.repairing(index, FieldIndex::entries)
    }

    /// Loads every record, ascending by ID.
    ///
    /// **Warning**: This is a full scan.
    pub fn list_all(&self) -> CoreResult<Vec<T>> {
        self.records
            .scan_all()?
            .map(|item| item.map(|(_, record)| record))
            .collect()
    }

    /// Returns the IDs of every record body on disk, ascending.
    pub fn ids(&self) -> CoreResult<Vec<RecordId>> {
        self.records.ids()
    }

    /// Returns the persisted live-record count.
    pub fn count(&self) -> CoreResult<u64> {
        self.allocator.count()
    }

    /// Returns the persisted counter.
    pub fn counter(&self) -> CoreResult<Counter> {
        self.allocator.load()
    }

    /// Rebuilds every index from the records and realigns the counter.
    ///
    /// This is the recovery procedure after a crash in the middle of a
    /// write. Run it while no other writer uses the store.
    pub fn reindex(&self) -> CoreResult<()> {
        info!(store = %self.location, "reindexing");
        for index in &self.indexes {
            index.delete_file()?;
        }

        let ids = self.records.ids()?;
        let counter = self
            .allocator
            .reconcile(ids.last().copied(), ids.len() as u64)?;
        debug!(next_id = counter.next_id, count = counter.count, "counter reconciled");

        self.init()
    }

    /// Checks every index and the counter against the records.
    ///
    /// Nothing is modified. Use [`Store::reindex`] to repair what it finds.
    pub fn verify(&self) -> CoreResult<VerifyReport> {
        let ids = self.records.ids()?;
        let mut expected: Vec<Vec<IndexEntry>> = vec![Vec::new(); self.indexes.len()];
        let mut record_problems = Vec::new();

        for item in self.records.scan_all()? {
            let (id, record) = match item {
                Ok(found) => found,
                Err(e) => {
                    record_problems.push(e.to_string());
                    continue;
                }
            };
            for (index, wanted) in self.indexes.iter().zip(expected.iter_mut()) {
                match index.entry_for(id, &record) {
                    Ok(entry) => wanted.push(entry),
                    Err(e) => record_problems.push(format!("record {id}: {e}")),
                }
            }
        }

        let mut report = VerifyReport {
            counter: self.allocator.load()?,
            records: ids.len() as u64,
            max_id: ids.last().copied(),
            indexes: self
                .indexes
                .iter()
                .zip(&expected)
                .map(|(index, wanted)| index.verify(wanted))
                .collect(),
            counter_problems: Vec::new(),
            record_problems,
        };
        report.check_counter();
        Ok(report)
    }

    /// Returns the configured indexes, in configuration order.
    pub fn indexes(&self) -> &[FieldIndex] {
        &self.indexes
    }

    /// Returns the index on `field`.
    pub fn index(&self, field: &str) -> CoreResult<&FieldIndex> {
        self.indexes
            .iter()
            .find(|index| index.field() == field)
            .ok_or_else(|| CoreError::UnknownIndex {
                field: field.to_string(),
            })
    }

    /// Returns the store directory. None for stores over a custom backend.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    /// Returns the backend location that prefixes every lock key.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the operation counters.
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    fn record_key(&self, id: RecordId) -> String {
        format!("{}/{}", self.location, id.file_name())
    }

    fn project_all(&self, id: RecordId, record: &T) -> CoreResult<Vec<IndexEntry>> {
        self.indexes
            .iter()
            .map(|index| index.entry_for(id, record))
            .collect()
    }

    /// Runs `op`, rebuilding the index once if its side file is corrupt or
    /// missing.
    fn repairing<R>(
        &self,
        index: &FieldIndex,
        op: impl Fn(&FieldIndex) -> CoreResult<R>,
    ) -> CoreResult<R> {
        match op(index) {
            Err(e) if e.is_corrupt_index() => {
                warn!(store = %self.location, field = index.field(), error = %e, "rebuilding unreadable index");
                self.stats.record_index_rebuild();
                index.rebuild(&self.records)?;
                op(index)
            }
            other => other,
        }
    }

    fn tally<R>(&self, result: &CoreResult<R>, success: fn(&StoreStats)) {
        match result {
            Ok(_) => success(&self.stats),
            Err(_) => self.stats.record_error(),
        }
    }
}

impl<T: Record> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.location)
            .field("indexes", &self.indexes)
            .field("body_format", &self.config.body_format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BodyFormat;
    use crate::record::{DynamicRecord, Identify, Project};
    use std::collections::HashSet;
    use std::fs;
    use std::thread;
    use tempfile::tempdir;

    fn user(name: &str, email: &str) -> DynamicRecord {
        DynamicRecord::new().with("UserName", name).with("Email", email)
    }

    fn page(parent: &str, url: &str, title: &str) -> DynamicRecord {
        DynamicRecord::new()
            .with("ParentID", parent)
            .with("Url", url)
            .with("Title", title)
    }

    fn user_indexes() -> Vec<IndexConfig> {
        vec![IndexConfig::new("UserName").unique(), IndexConfig::new("Email").unique()]
    }

    fn page_indexes() -> Vec<IndexConfig> {
        vec![
            IndexConfig::new("Url").unique(),
            IndexConfig::new("ParentID").include(["Url", "Title"]),
        ]
    }

    fn memory_store(indexes: Vec<IndexConfig>) -> (Store<DynamicRecord>, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Store::open_with_backend(backend.clone(), indexes, Config::default()).unwrap();
        store.init().unwrap();
        (store, backend)
    }

    fn text(backend: &InMemoryBackend, name: &str) -> String {
        String::from_utf8(backend.read(name).unwrap()).unwrap()
    }

    #[test]
    fn init_creates_counter_and_indexes() {
        let (store, backend) = memory_store(user_indexes());

        assert_eq!(text(&backend, "counter"), "1\n0\n");
        assert_eq!(text(&backend, "idx_UserName.idx"), "");
        assert_eq!(text(&backend, "idx_Email.idx"), "");
        assert_eq!(store.count().unwrap(), 0);

        store.init().unwrap();
        assert_eq!(store.stats().index_rebuilds(), 2);
    }

    #[test]
    fn first_insert_layout() {
        let dir = tempdir().unwrap();
        let store: Store<DynamicRecord> = Store::open(
            dir.path(),
            vec![IndexConfig::new("UserName").unique()],
            Config::default(),
        )
        .unwrap();
        store.init().unwrap();

        let mut alice = user("alice", "a@x.com");
        let id = store.insert(&mut alice).unwrap();

        assert_eq!(id, RecordId::new(1));
        assert_eq!(alice.id(), Some(id));
        assert!(dir.path().join("1.rec").is_file());
        assert_eq!(
            fs::read_to_string(dir.path().join("idx_UserName.idx")).unwrap(),
            "alice\t1\n"
        );
        assert_eq!(fs::read_to_string(dir.path().join("counter")).unwrap(), "2\n1\n");
    }

    #[test]
    fn find_returns_what_was_inserted() {
        let (store, _) = memory_store(user_indexes());
        let mut alice = user("alice", "a@x.com");
        let id = store.insert(&mut alice).unwrap();

        assert_eq!(store.find(id).unwrap(), alice);
    }

    #[test]
    fn duplicate_insert_changes_nothing() {
        let (store, backend) = memory_store(user_indexes());
        store.insert(&mut user("alice", "a@x.com")).unwrap();
        let before: Vec<_> = ["1.rec", "idx_UserName.idx", "idx_Email.idx"]
            .iter()
            .map(|name| text(&backend, name))
            .collect();

        let mut again = user("alice", "b@y.com");
        let err = store.insert(&mut again).unwrap_err();

        assert!(err.is_duplicate_key());
        assert_eq!(again.id(), None);
        assert_eq!(store.count().unwrap(), 1);
        assert!(!backend.exists("2.rec").unwrap());
        let after: Vec<_> = ["1.rec", "idx_UserName.idx", "idx_Email.idx"]
            .iter()
            .map(|name| text(&backend, name))
            .collect();
        assert_eq!(before, after);
        assert_eq!(store.stats().rollbacks(), 1);
    }

    #[test]
    fn duplicate_in_a_later_index_rolls_back_earlier_ones() {
        let (store, backend) = memory_store(user_indexes());
        store.insert(&mut user("alice", "a@x.com")).unwrap();

        let err = store.insert(&mut user("bob", "a@x.com")).unwrap_err();

        assert!(matches!(err, CoreError::DuplicateKey { ref field, .. } if field == "Email"));
        assert_eq!(text(&backend, "idx_UserName.idx"), "alice\t1\n");
        assert!(store.list_projected("UserName", "bob").unwrap().is_empty());
    }

    #[test]
    fn rolled_back_ids_are_not_reused() {
        let (store, _) = memory_store(user_indexes());
        store.insert(&mut user("alice", "a@x.com")).unwrap();
        store.insert(&mut user("alice", "b@y.com")).unwrap_err();

        let id = store.insert(&mut user("bob", "b@y.com")).unwrap();
        assert_eq!(id, RecordId::new(3));
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn insert_with_id_is_rejected() {
        let (store, _) = memory_store(user_indexes());
        let mut alice = user("alice", "a@x.com");
        store.insert(&mut alice).unwrap();

        assert!(matches!(
            store.insert(&mut alice),
            Err(CoreError::IdAlreadyAssigned { id }) if id == RecordId::new(1)
        ));
    }

    #[test]
    fn invalid_key_is_rejected_before_any_write() {
        let (store, backend) = memory_store(user_indexes());

        let err = store.insert(&mut user("al\tice", "a@x.com")).unwrap_err();

        assert!(matches!(err, CoreError::InvalidKey { .. }));
        assert_eq!(text(&backend, "counter"), "1\n0\n");
        assert_eq!(text(&backend, "idx_UserName.idx"), "");
    }

    #[test]
    fn covering_lookup_does_not_read_bodies() {
        let (store, backend) = memory_store(page_indexes());
        store.insert(&mut page("", "/", "Home")).unwrap();
        let id = store.insert(&mut page("1", "/x", "X")).unwrap();

        backend.remove(&id.file_name()).unwrap();
        let children = store.list_projected("ParentID", "1").unwrap();

        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, id);
        assert_eq!(children[0].other("Url"), Some("/x"));
        assert_eq!(children[0].other("Title"), Some("X"));
        assert_eq!(store.stats().reads(), 0);
    }

    #[test]
    fn list_loads_full_records() {
        let (store, _) = memory_store(page_indexes());
        store.insert(&mut page("", "/", "Home")).unwrap();
        store.insert(&mut page("1", "/a", "A")).unwrap();
        store.insert(&mut page("1", "/b", "B")).unwrap();

        let children = store.list("ParentID", "1").unwrap();
        let titles: Vec<_> = children.iter().map(|p| p.project("Title").unwrap()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(children[0].id(), Some(RecordId::new(2)));

        let roots = store.list_projected("ParentID", "").unwrap();
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn unknown_index() {
        let (store, _) = memory_store(page_indexes());
        assert!(matches!(
            store.list_projected("Title", "X"),
            Err(CoreError::UnknownIndex { field }) if field == "Title"
        ));
    }

    #[test]
    fn update_reflects_new_projections() {
        let (store, _) = memory_store(page_indexes());
        let mut x = page("1", "/x", "X");
        let id = store.insert(&mut x).unwrap();

        let mut moved = page("2", "/y", "Y");
        moved.set_id(id);
        store.update(&moved).unwrap();

        assert!(store.list_projected("ParentID", "1").unwrap().is_empty());
        let entries = store.list_projected("ParentID", "2").unwrap();
        assert_eq!(entries[0].other("Url"), Some("/y"));
        assert!(store.list_projected("Url", "/x").unwrap().is_empty());
        assert_eq!(store.find(id).unwrap(), moved);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn update_to_taken_value_restores_everything() {
        let (store, backend) = memory_store(user_indexes());
        store.insert(&mut user("alice", "a@x.com")).unwrap();
        let mut bob = user("bob", "b@y.com");
        store.insert(&mut bob).unwrap();
        let before = (
            text(&backend, "2.rec"),
            text(&backend, "idx_UserName.idx"),
            text(&backend, "idx_Email.idx"),
        );

        let mut stolen = user("bobby", "a@x.com");
        stolen.set_id(RecordId::new(2));
        assert!(store.update(&stolen).unwrap_err().is_duplicate_key());

        let after = (
            text(&backend, "2.rec"),
            text(&backend, "idx_UserName.idx"),
            text(&backend, "idx_Email.idx"),
        );
        assert_eq!(before, after);
        assert_eq!(store.find(RecordId::new(2)).unwrap(), bob);
    }

    #[test]
    fn update_requires_an_existing_record() {
        let (store, _) = memory_store(user_indexes());

        assert!(matches!(store.update(&user("a", "b")), Err(CoreError::MissingId)));

        let mut ghost = user("ghost", "g@x.com");
        ghost.set_id(RecordId::new(7));
        assert!(store.update(&ghost).unwrap_err().is_not_found());
        assert!(store.list_projected("UserName", "ghost").unwrap().is_empty());
    }

    #[test]
    fn delete_removes_body_and_entries() {
        let (store, _) = memory_store(page_indexes());
        let id = store.insert(&mut page("", "/", "Home")).unwrap();
        store.insert(&mut page("1", "/x", "X")).unwrap();

        store.delete(id).unwrap();

        assert!(store.find(id).unwrap_err().is_not_found());
        for field in ["Url", "ParentID"] {
            let ids: Vec<_> = store.list_all_projected(field).unwrap().iter().map(|e| e.id).collect();
            assert!(!ids.contains(&id), "{field}");
        }
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.delete(id).unwrap_err().is_not_found());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn failed_index_write_rolls_back_insert() {
        let (store, backend) = memory_store(page_indexes());
        backend.fail_writes_to("idx_ParentID.idx");

        let mut p = page("1", "/x", "X");
        assert!(store.insert(&mut p).is_err());
        backend.clear_failures();

        assert_eq!(p.id(), None);
        assert!(!backend.exists("1.rec").unwrap());
        assert_eq!(text(&backend, "idx_Url.idx"), "");
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.stats().errors(), 1);
    }

    #[test]
    fn failed_index_write_rolls_back_delete() {
        let (store, backend) = memory_store(page_indexes());
        let id = store.insert(&mut page("", "/", "Home")).unwrap();
        backend.fail_writes_to("idx_ParentID.idx");

        assert!(store.delete(id).is_err());
        backend.clear_failures();

        assert!(store.find(id).is_ok());
        assert_eq!(store.list_projected("Url", "/").unwrap().len(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn corrupt_index_is_rebuilt_on_lookup() {
        let (store, backend) = memory_store(user_indexes());
        store.insert(&mut user("alice", "a@x.com")).unwrap();
        backend.write_atomic("idx_UserName.idx", b"garbage without tabs\n").unwrap();

        let found = store.list_projected("UserName", "alice").unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(text(&backend, "idx_UserName.idx"), "alice\t1\n");
        assert_eq!(store.stats().index_rebuilds(), 3);
    }

    #[test]
    fn missing_index_is_rebuilt_on_write() {
        let (store, backend) = memory_store(user_indexes());
        store.insert(&mut user("alice", "a@x.com")).unwrap();
        backend.remove("idx_Email.idx").unwrap();

        assert!(store.insert(&mut user("bob", "a@x.com")).unwrap_err().is_duplicate_key());
        assert_eq!(text(&backend, "idx_Email.idx"), "a@x.com\t1\n");
    }

    #[test]
    fn init_rebuilds_deleted_index() {
        let (store, backend) = memory_store(page_indexes());
        for (parent, url) in [("", "/"), ("1", "/a"), ("1", "/b")] {
            store.insert(&mut page(parent, url, "T")).unwrap();
        }
        let before: HashSet<_> = store.list_all_projected("ParentID").unwrap().into_iter().collect();

        backend.remove("idx_ParentID.idx").unwrap();
        store.init().unwrap();

        let after: HashSet<_> = store.list_all_projected("ParentID").unwrap().into_iter().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn init_recreates_lost_counter() {
        let (store, backend) = memory_store(user_indexes());
        for name in ["a", "b", "c"] {
            store.insert(&mut user(name, name)).unwrap();
        }
        store.delete(RecordId::new(2)).unwrap();
        backend.remove("counter").unwrap();

        store.init().unwrap();

        assert_eq!(store.counter().unwrap(), Counter { next_id: 4, count: 2 });
    }

    #[test]
    fn insert_without_counter_keeps_existing_records() {
        let (store, backend) = memory_store(vec![IndexConfig::new("UserName").unique()]);
        let alice = store.insert(&mut user("alice", "a@x.com")).unwrap();
        backend.remove("counter").unwrap();

        let mut bob = user("bob", "b@y.com");
        let err = store.insert(&mut bob).unwrap_err();

        assert!(matches!(err, CoreError::CorruptCounter { .. }));
        assert_eq!(bob.id(), None);
        assert_eq!(store.find(alice).unwrap().project("UserName").as_deref(), Some("alice"));
        assert_eq!(store.list_projected("UserName", "alice").unwrap()[0].id, alice);

        store.init().unwrap();
        assert_eq!(store.insert(&mut bob).unwrap(), RecordId::new(2));
        assert_eq!(store.list_all().unwrap().len(), 2);
    }

    #[test]
    fn stale_counter_never_overwrites_a_body() {
        let (store, backend) = memory_store(user_indexes());
        let alice = store.insert(&mut user("alice", "a@x.com")).unwrap();
        backend.write_atomic("counter", b"1\n1\n").unwrap();

        let mut bob = user("bob", "b@y.com");
        let err = store.insert(&mut bob).unwrap_err();

        assert!(matches!(err, CoreError::CorruptCounter { .. }));
        assert_eq!(bob.id(), None);
        assert_eq!(store.find(alice).unwrap().project("Email").as_deref(), Some("a@x.com"));
        assert!(store.list_projected("UserName", "bob").unwrap().is_empty());
        assert_eq!(store.stats().errors(), 1);

        // The burned id moved the counter past alice.
        assert_eq!(store.insert(&mut bob).unwrap(), RecordId::new(2));
    }

    #[test]
    fn reindex_repairs_drift() {
        let (store, backend) = memory_store(user_indexes());
        store.insert(&mut user("alice", "a@x.com")).unwrap();
        store.insert(&mut user("bob", "b@y.com")).unwrap();
        backend.write_atomic("idx_UserName.idx", b"alice\t1\nzed\t9\n").unwrap();
        backend.write_atomic("counter", b"2\n7\n").unwrap();

        let report = store.verify().unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.indexes[0].problems.len(), 2);
        assert!(report.indexes[1].is_ok());
        assert_eq!(report.counter_problems.len(), 2);

        store.reindex().unwrap();

        assert!(store.verify().unwrap().is_ok());
        assert_eq!(store.counter().unwrap(), Counter { next_id: 3, count: 2 });
        assert_eq!(text(&backend, "idx_UserName.idx"), "alice\t1\nbob\t2\n");
    }

    #[test]
    fn verify_reports_corrupt_bodies() {
        let (store, backend) = memory_store(user_indexes());
        store.insert(&mut user("alice", "a@x.com")).unwrap();
        backend.write_atomic("1.rec", b"{broken").unwrap();

        let report = store.verify().unwrap();
        assert_eq!(report.record_problems.len(), 1);
        assert!(!report.is_ok());
    }

    #[test]
    fn list_all_is_ascending() {
        let (store, _) = memory_store(user_indexes());
        for name in ["c", "a", "b"] {
            store.insert(&mut user(name, name)).unwrap();
        }

        let ids: Vec<_> = store.list_all().unwrap().iter().filter_map(Identify::id).collect();
        assert_eq!(ids, vec![RecordId::new(1), RecordId::new(2), RecordId::new(3)]);
    }

    #[test]
    fn concurrent_inserts_get_distinct_ids() {
        let (store, _) = memory_store(user_indexes());
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..10)
                        .map(|i| {
                            let name = format!("u{t}-{i}");
                            store.insert(&mut user(&name, &name)).unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let ids: HashSet<_> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();

        assert_eq!(ids.len(), 80);
        assert_eq!(store.count().unwrap(), 80);
        assert_eq!(store.list_all_projected("UserName").unwrap().len(), 80);
        assert!(store.verify().unwrap().is_ok());
    }

    #[test]
    fn two_handles_on_one_directory_share_locks() {
        let dir = tempdir().unwrap();
        let open = || {
            let store: Store<DynamicRecord> = Store::open(
                dir.path(),
                user_indexes(),
                Config::default().sync_writes(false),
            )
            .unwrap();
            store.init().unwrap();
            Arc::new(store)
        };
        let (a, b) = (open(), open());

        let handles: Vec<_> = [a, b]
            .into_iter()
            .map(|store| {
                thread::spawn(move || {
                    (0..20)
                        .filter(|i| {
                            let name = format!("shared-{i}");
                            store.insert(&mut user(&name, &name)).is_ok()
                        })
                        .count()
                })
            })
            .collect();
        let inserted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(inserted, 20);
        let check = open();
        assert_eq!(check.count().unwrap(), 20);
        assert!(check.verify().unwrap().is_ok());
    }

    #[test]
    fn cbor_bodies() {
        let dir = tempdir().unwrap();
        let config = Config::default().body_format(BodyFormat::Cbor);
        let store: Store<DynamicRecord> = Store::open(dir.path(), user_indexes(), config).unwrap();
        store.init().unwrap();

        let mut alice = user("alice", "a@x.com");
        let id = store.insert(&mut alice).unwrap();

        let raw = fs::read(dir.path().join("1.rec")).unwrap();
        assert!(serde_json::from_slice::<serde_json::Value>(&raw).is_err());
        assert_eq!(store.find(id).unwrap(), alice);
    }

    #[test]
    fn invalid_index_list() {
        let result = Store::<DynamicRecord>::open_with_backend(
            Arc::new(InMemoryBackend::new()),
            vec![IndexConfig::new("Url").include(["Url"])],
            Config::default(),
        );
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn path_and_location() {
        let dir = tempdir().unwrap();
        let store: Store<DynamicRecord> = Store::open(dir.path(), Vec::new(), Config::default()).unwrap();
        assert_eq!(store.path(), Some(fs::canonicalize(dir.path()).unwrap().as_path()));

        let (memory, _) = memory_store(Vec::new());
        assert!(memory.path().is_none());
        assert!(memory.location().starts_with("memory:"));
    }
}
