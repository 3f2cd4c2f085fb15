//! Side-file index over one field.

use crate::error::{CoreError, CoreResult};
use crate::index::entry::{self, IndexEntry, ParsedIndex};
use crate::index::config::IndexConfig;
use crate::index::verify::{self, IndexProblem, IndexReport};
use crate::lock::LockManager;
use crate::record::{Project, Record, RecordStore};
use crate::types::RecordId;
use filedb_storage::StorageBackend;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A covering secondary index stored in `idx_<field>.idx`.
///
/// Mutations hold the index's lock key for the full read-modify-write.
/// Reads take no lock; they see the last fully published file because
/// every rewrite is an atomic replace and an unfinished append is ignored.
///
/// # Example
///
/// ```rust
/// use filedb_core::{DynamicRecord, FieldIndex, IndexConfig, IndexEntry, InMemoryBackend, LockManager, RecordId};
/// use std::sync::Arc;
///
/// let index = FieldIndex::new(
///     Arc::new(InMemoryBackend::new()),
///     Arc::new(LockManager::new()),
///     IndexConfig::new("UserName").unique(),
/// );
/// index.create_empty().unwrap();
///
/// let alice = DynamicRecord::new().with("UserName", "alice");
/// index.add(&index.entry_for(RecordId::new(1), &alice).unwrap()).unwrap();
///
/// assert_eq!(index.lookup("alice").unwrap()[0].id, RecordId::new(1));
/// ```
pub struct FieldIndex {
    config: IndexConfig,
    file_name: String,
    lock_key: String,
    backend: Arc<dyn StorageBackend>,
    locks: Arc<LockManager>,
}

impl FieldIndex {
    /// Creates the index handle. Nothing is read or written.
    pub fn new(backend: Arc<dyn StorageBackend>, locks: Arc<LockManager>, config: IndexConfig) -> Self {
        let file_name = config.file_name();
        let lock_key = format!("{}/{file_name}", backend.location());
        Self {
            config,
            file_name,
            lock_key,
            backend,
            locks,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Returns the indexed field.
    pub fn field(&self) -> &str {
        &self.config.field
    }

    /// Returns the side file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns true if the side file exists.
    pub fn exists(&self) -> CoreResult<bool> {
        Ok(self.backend.exists(&self.file_name)?)
    }

    /// Projects `record` into this index's entry for `id`.
    pub fn entry_for<T: Project>(&self, id: RecordId, record: &T) -> CoreResult<IndexEntry> {
        IndexEntry::from_record(&self.config, id, record)
    }

    /// Returns every entry, in file order.
    ///
    /// A missing side file is reported as [`CoreError::CorruptIndex`].
    pub fn entries(&self) -> CoreResult<Vec<IndexEntry>> {
        Ok(self.load()?.entries)
    }

    /// Returns the entries whose value equals `value`.
    pub fn lookup(&self, value: &str) -> CoreResult<Vec<IndexEntry>> {
        let mut entries = self.entries()?;
        entries.retain(|e| e.value == value);
        Ok(entries)
    }

    /// Adds `entry`.
    ///
    /// An existing entry for the same ID is replaced.
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateKey`] if the index is unique and another record
    /// already holds the value. Nothing is written in that case.
    pub fn add(&self, entry: &IndexEntry) -> CoreResult<()> {
        let _guard = self.locks.acquire(&self.lock_key);
        let mut current = self.load()?;
        self.check_unique(&current.entries, entry)?;

        let replaces = current.entries.iter().any(|e| e.id == entry.id);
        if replaces || current.torn_tail {
            current.entries.retain(|e| e.id != entry.id);
            current.entries.push(entry.clone());
            self.publish(&current.entries)?;
        } else {
            self.backend
                .append(&self.file_name, entry.to_line(&self.config).as_bytes())?;
        }
        debug!(field = %self.config.field, id = %entry.id, "index entry added");
        Ok(())
    }

    /// Replaces the entry for `entry.id`, adding it if absent.
    ///
    /// Returns the entry it replaced.
    pub fn update(&self, entry: &IndexEntry) -> CoreResult<Option<IndexEntry>> {
        let _guard = self.locks.acquire(&self.lock_key);
        let mut current = self.load()?;
        self.check_unique(&current.entries, entry)?;

        let previous = current.entries.iter().find(|e| e.id == entry.id).cloned();
        if previous.as_ref() == Some(entry) && !current.torn_tail {
            return Ok(previous);
        }

        let position = current.entries.iter().position(|e| e.id == entry.id);
        current.entries.retain(|e| e.id != entry.id);
        match position {
            Some(at) => current.entries.insert(at, entry.clone()),
            None => current.entries.push(entry.clone()),
        }
        self.publish(&current.entries)?;
        debug!(field = %self.config.field, id = %entry.id, "index entry updated");
        Ok(previous)
    }

    /// Removes every entry for `id`. Returns false if there was none.
    pub fn remove(&self, id: RecordId) -> CoreResult<bool> {
        let _guard = self.locks.acquire(&self.lock_key);
        let mut current = self.load()?;
        let before = current.entries.len();
        current.entries.retain(|e| e.id != id);
        let removed = current.entries.len() != before;

        if removed || current.torn_tail {
            self.publish(&current.entries)?;
        }
        if removed {
            debug!(field = %self.config.field, %id, "index entry removed");
        }
        Ok(removed)
    }

    /// Writes an empty side file if none exists.
    pub fn create_empty(&self) -> CoreResult<bool> {
        let _guard = self.locks.acquire(&self.lock_key);
        if self.exists()? {
            return Ok(false);
        }
        self.publish(&[])?;
        Ok(true)
    }

    /// Builds the side file from `records` if it does not exist.
    ///
    /// Returns true if a build happened.
    pub fn ensure_built<T: Record>(&self, records: &RecordStore<T>) -> CoreResult<bool> {
        let _guard = self.locks.acquire(&self.lock_key);
        if self.exists()? {
            return Ok(false);
        }
        self.build_locked(records)?;
        Ok(true)
    }

    /// Rebuilds the side file from `records`, replacing whatever is there.
    ///
    /// Returns the number of entries written.
    pub fn rebuild<T: Record>(&self, records: &RecordStore<T>) -> CoreResult<usize> {
        let _guard = self.locks.acquire(&self.lock_key);
        self.build_locked(records)
    }

    /// Deletes the side file. Returns false if it did not exist.
    pub fn delete_file(&self) -> CoreResult<bool> {
        let _guard = self.locks.acquire(&self.lock_key);
        match self.backend.remove(&self.file_name) {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Compares the side file with `expected` without modifying anything.
    pub fn verify(&self, expected: &[IndexEntry]) -> IndexReport {
        match self.load() {
            Ok(parsed) => verify::compare(&self.config, &parsed, expected),
            Err(e) => IndexReport {
                field: self.config.field.clone(),
                entries: 0,
                problems: vec![IndexProblem::Unreadable {
                    message: e.to_string(),
                }],
            },
        }
    }

    fn build_locked<T: Record>(&self, records: &RecordStore<T>) -> CoreResult<usize> {
        let mut entries = Vec::new();
        for item in records.scan_all()? {
            let (id, record) = item?;
            entries.push(self.entry_for(id, &record)?);
        }

        if self.config.unique {
            let mut owners: HashMap<&str, RecordId> = HashMap::new();
            for e in &entries {
                if let Some(first) = owners.insert(&e.value, e.id) {
                    warn!(
                        field = %self.config.field,
                        value = %e.value,
                        first = %first,
                        second = %e.id,
                        "unique index rebuilt with a duplicate value"
                    );
                }
            }
        }

        self.publish(&entries)?;
        info!(field = %self.config.field, entries = entries.len(), "index built");
        Ok(entries.len())
    }

    fn check_unique(&self, entries: &[IndexEntry], entry: &IndexEntry) -> CoreResult<()> {
        if self.config.unique
            && entries
                .iter()
                .any(|e| e.value == entry.value && e.id != entry.id)
        {
            return Err(CoreError::duplicate_key(&self.config.field, &entry.value));
        }
        Ok(())
    }

    fn load(&self) -> CoreResult<ParsedIndex> {
        let data = self.backend.read(&self.file_name).map_err(|e| {
            if e.is_not_found() {
                CoreError::corrupt_index(&self.config.field, "side file is missing")
            } else {
                e.into()
            }
        })?;
        entry::parse(&self.config, &data)
    }

    fn publish(&self, entries: &[IndexEntry]) -> CoreResult<()> {
        let text = entry::format(&self.config, entries);
        self.backend.write_atomic(&self.file_name, text.as_bytes())?;
        Ok(())
    }
}

impl std::fmt::Debug for FieldIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldIndex")
            .field("config", &self.config)
            .field("lock_key", &self.lock_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BodyFormat;
    use crate::record::DynamicRecord;
    use filedb_storage::InMemoryBackend;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        records: RecordStore<DynamicRecord>,
        locks: Arc<LockManager>,
    }

    impl Fixture {
        fn new() -> Self {
            let backend = Arc::new(InMemoryBackend::new());
            Self {
                records: RecordStore::new(backend.clone(), BodyFormat::Json),
                backend,
                locks: Arc::new(LockManager::new()),
            }
        }

        fn index(&self, config: IndexConfig) -> FieldIndex {
            let index = FieldIndex::new(self.backend.clone(), self.locks.clone(), config);
            index.create_empty().unwrap();
            index
        }

        fn file(&self, name: &str) -> String {
            String::from_utf8(self.backend.read(name).unwrap()).unwrap()
        }
    }

    fn user(name: &str) -> DynamicRecord {
        DynamicRecord::new().with("UserName", name)
    }

    fn page(parent: &str, url: &str, title: &str) -> DynamicRecord {
        DynamicRecord::new()
            .with("ParentID", parent)
            .with("Url", url)
            .with("Title", title)
    }

    #[test]
    fn add_appends_a_line() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName").unique());

        index.add(&index.entry_for(RecordId::new(1), &user("alice")).unwrap()).unwrap();
        index.add(&index.entry_for(RecordId::new(2), &user("bob")).unwrap()).unwrap();

        assert_eq!(fx.file("idx_UserName.idx"), "alice\t1\nbob\t2\n");
    }

    #[test]
    fn duplicate_is_rejected_without_writing() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName").unique());
        index.add(&index.entry_for(RecordId::new(1), &user("alice")).unwrap()).unwrap();

        let err = index
            .add(&index.entry_for(RecordId::new(2), &user("alice")).unwrap())
            .unwrap_err();

        assert!(matches!(err, CoreError::DuplicateKey { ref field, ref value } if field == "UserName" && value == "alice"));
        assert_eq!(fx.file("idx_UserName.idx"), "alice\t1\n");
    }

    #[test]
    fn re_adding_the_same_id_replaces() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName").unique());
        index.add(&index.entry_for(RecordId::new(1), &user("alice")).unwrap()).unwrap();
        index.add(&index.entry_for(RecordId::new(1), &user("alice")).unwrap()).unwrap();

        assert_eq!(fx.file("idx_UserName.idx"), "alice\t1\n");
    }

    #[test]
    fn non_unique_allows_shared_values() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("ParentID").include(["Url", "Title"]));
        index.add(&index.entry_for(RecordId::new(2), &page("1", "/a", "A")).unwrap()).unwrap();
        index.add(&index.entry_for(RecordId::new(3), &page("1", "/b", "B")).unwrap()).unwrap();
        index.add(&index.entry_for(RecordId::new(4), &page("2", "/c", "C")).unwrap()).unwrap();

        let children = index.lookup("1").unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].other("Url"), Some("/b"));
        assert_eq!(children[1].other("Title"), Some("B"));
        assert!(index.lookup("9").unwrap().is_empty());
    }

    #[test]
    fn update_rewrites_in_place() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName").unique());
        for (id, name) in [(1, "alice"), (2, "bob")] {
            index.add(&index.entry_for(RecordId::new(id), &user(name)).unwrap()).unwrap();
        }

        let previous = index
            .update(&index.entry_for(RecordId::new(1), &user("alicia")).unwrap())
            .unwrap();

        assert_eq!(previous.unwrap().value, "alice");
        assert_eq!(fx.file("idx_UserName.idx"), "alicia\t1\nbob\t2\n");
    }

    #[test]
    fn update_to_a_taken_value_fails() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName").unique());
        for (id, name) in [(1, "alice"), (2, "bob")] {
            index.add(&index.entry_for(RecordId::new(id), &user(name)).unwrap()).unwrap();
        }

        let err = index
            .update(&index.entry_for(RecordId::new(2), &user("alice")).unwrap())
            .unwrap_err();

        assert!(err.is_duplicate_key());
        assert_eq!(fx.file("idx_UserName.idx"), "alice\t1\nbob\t2\n");
    }

    #[test]
    fn remove_rewrites_without_the_id() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName"));
        for (id, name) in [(1, "alice"), (2, "bob")] {
            index.add(&index.entry_for(RecordId::new(id), &user(name)).unwrap()).unwrap();
        }

        assert!(index.remove(RecordId::new(1)).unwrap());
        assert!(!index.remove(RecordId::new(1)).unwrap());
        assert_eq!(fx.file("idx_UserName.idx"), "bob\t2\n");
    }

    #[test]
    fn torn_append_is_invisible_and_repaired() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName").unique());
        fx.backend.append("idx_UserName.idx", b"alice\t1\nbo").unwrap();

        assert_eq!(index.entries().unwrap().len(), 1);

        index.add(&index.entry_for(RecordId::new(2), &user("bob")).unwrap()).unwrap();
        assert_eq!(fx.file("idx_UserName.idx"), "alice\t1\nbob\t2\n");
    }

    #[test]
    fn missing_file_is_corrupt() {
        let fx = Fixture::new();
        let index = FieldIndex::new(fx.backend.clone(), fx.locks.clone(), IndexConfig::new("Url"));

        assert!(index.lookup("/x").unwrap_err().is_corrupt_index());
        assert!(index
            .add(&index.entry_for(RecordId::new(1), &page("", "/x", "")).unwrap())
            .unwrap_err()
            .is_corrupt_index());
    }

    #[test]
    fn ensure_built_scans_records_once() {
        let fx = Fixture::new();
        fx.records.put(RecordId::new(1), &page("", "/", "Home")).unwrap();
        fx.records.put(RecordId::new(2), &page("1", "/x", "X")).unwrap();
        let index = FieldIndex::new(
            fx.backend.clone(),
            fx.locks.clone(),
            IndexConfig::new("ParentID").include(["Url", "Title"]),
        );

        assert!(index.ensure_built(&fx.records).unwrap());
        assert!(!index.ensure_built(&fx.records).unwrap());
        assert_eq!(fx.file("idx_ParentID.idx"), "\t1\t/\tHome\n1\t2\t/x\tX\n");
    }

    #[test]
    fn rebuild_keeps_duplicate_values() {
        let fx = Fixture::new();
        fx.records.put(RecordId::new(1), &user("alice")).unwrap();
        fx.records.put(RecordId::new(2), &user("alice")).unwrap();
        let index = fx.index(IndexConfig::new("UserName").unique());

        assert_eq!(index.rebuild(&fx.records).unwrap(), 2);

        let report = index.verify(&index.entries().unwrap());
        assert_eq!(
            report.problems,
            vec![IndexProblem::DuplicateValue {
                value: "alice".into(),
                ids: vec![RecordId::new(1), RecordId::new(2)],
            }]
        );
    }

    #[test]
    fn failed_write_leaves_file_alone() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName"));
        index.add(&index.entry_for(RecordId::new(1), &user("alice")).unwrap()).unwrap();
        fx.backend.fail_writes_to("idx_UserName.idx");

        assert!(index.remove(RecordId::new(1)).is_err());
        fx.backend.clear_failures();
        assert_eq!(fx.file("idx_UserName.idx"), "alice\t1\n");
    }

    #[test]
    fn delete_file() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName"));

        assert!(index.delete_file().unwrap());
        assert!(!index.delete_file().unwrap());
        assert!(!index.exists().unwrap());
        assert_eq!(fx.locks.active_keys(), 0);
    }

    #[test]
    fn unreadable_file_is_reported() {
        let fx = Fixture::new();
        let index = fx.index(IndexConfig::new("UserName"));
        fx.backend.write_atomic("idx_UserName.idx", b"alice\tone\n").unwrap();

        let report = index.verify(&[]);
        assert!(matches!(report.problems[..], [IndexProblem::Unreadable { .. }]));
    }

    #[test]
    fn concurrent_unique_adds_admit_one_winner() {
        let fx = Fixture::new();
        let index = Arc::new(fx.index(IndexConfig::new("UserName").unique()));

        let handles: Vec<_> = (1..=8)
            .map(|id| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    let entry = index.entry_for(RecordId::new(id), &user("alice")).unwrap();
                    index.add(&entry).is_ok()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(index.entries().unwrap().len(), 1);
    }
}
