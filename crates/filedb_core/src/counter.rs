//! Persistent ID allocation.
//!
//! The `counter` file holds two decimal lines: the next ID to issue and the
//! number of live records.
//!
//! ```text
//! 4
//! 3
//! ```
//!
//! Every mutation is a read-modify-write under the counter's lock key, and
//! the new content is published with an atomic replace before the lock is
//! released. An ID returned by [`IdAllocator::next_id`] is therefore durable
//! before the caller ever sees it; a crash cannot hand the same ID out twice.

use crate::error::{CoreError, CoreResult};
use crate::lock::LockManager;
use crate::types::RecordId;
use filedb_storage::StorageBackend;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Name of the counter file inside a store.
pub(crate) const COUNTER_FILE: &str = "counter";

/// Persisted allocator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counter {
    /// The next ID to issue. Every issued ID is smaller.
    pub next_id: u64,
    /// Number of live records.
    pub count: u64,
}

impl Default for Counter {
    fn default() -> Self {
        Self {
            next_id: 1,
            count: 0,
        }
    }
}

impl Counter {
    fn encode(&self) -> String {
        format!("{}\n{}\n", self.next_id, self.count)
    }

    fn decode(data: &[u8]) -> CoreResult<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| CoreError::corrupt_counter("not valid UTF-8"))?;
        let mut lines = text.lines().map(str::trim);

        let mut field = |name: &str| -> CoreResult<u64> {
            let line = lines
                .next()
                .ok_or_else(|| CoreError::corrupt_counter(format!("missing {name}")))?;
            line.parse()
                .map_err(|_| CoreError::corrupt_counter(format!("bad {name}: {line:?}")))
        };

        let next_id = field("next id")?;
        let count = field("count")?;
        if next_id == 0 {
            return Err(CoreError::corrupt_counter("next id must be at least 1"));
        }
        Ok(Self { next_id, count })
    }
}

/// Issues record IDs and tracks the live-record count of one store.
pub struct IdAllocator {
    backend: Arc<dyn StorageBackend>,
    locks: Arc<LockManager>,
    lock_key: String,
}

impl IdAllocator {
    /// Creates an allocator over `backend`.
    pub fn new(backend: Arc<dyn StorageBackend>, locks: Arc<LockManager>) -> Self {
        let lock_key = format!("{}/{COUNTER_FILE}", backend.location());
        Self {
            backend,
            locks,
            lock_key,
        }
    }

    /// Returns true if the counter file exists.
    pub fn exists(&self) -> CoreResult<bool> {
        Ok(self.backend.exists(COUNTER_FILE)?)
    }

    /// Creates the counter file with `NextID=1, Count=0` if it is missing.
    pub fn ensure_created(&self) -> CoreResult<()> {
        self.initialize_with(Counter::default()).map(|_| ())
    }

    /// Creates the counter file with `counter` if it is missing.
    ///
    /// Returns the counter that is in effect afterwards.
    pub(crate) fn initialize_with(&self, counter: Counter) -> CoreResult<Counter> {
        let _guard = self.locks.acquire(&self.lock_key);
        if self.backend.exists(COUNTER_FILE)? {
            return self.read();
        }
        self.write(&counter)?;
        debug!(next_id = counter.next_id, count = counter.count, "created counter");
        Ok(counter)
    }

    /// Returns the last persisted counter state.
    ///
    /// A missing file reads as the initial state.
    pub fn load(&self) -> CoreResult<Counter> {
        self.read_or_initial()
    }

    /// Returns a fresh ID, durably advancing the counter first.
    ///
    /// # Errors
    ///
    /// [`CoreError::CorruptCounter`] if the counter file is missing or
    /// unreadable. Starting over at 1 would reissue IDs still on disk.
    pub fn next_id(&self) -> CoreResult<RecordId> {
        let _guard = self.locks.acquire(&self.lock_key);
        let mut counter = self.read()?;
        let id = RecordId::new(counter.next_id);
        counter.next_id += 1;
        self.write(&counter)?;
        debug!(%id, "allocated record id");
        Ok(id)
    }

    /// Returns the last persisted live-record count.
    pub fn count(&self) -> CoreResult<u64> {
        Ok(self.read()?.count)
    }

    /// Records one successful insert.
    pub(crate) fn record_inserted(&self) -> CoreResult<()> {
        self.update(|c| c.count += 1)
    }

    /// Records one successful delete.
    pub(crate) fn record_deleted(&self) -> CoreResult<()> {
        self.update(|c| c.count = c.count.saturating_sub(1))
    }

    /// Aligns the counter with the records actually on disk.
    ///
    /// `next_id` only ever moves forward.
    pub(crate) fn reconcile(&self, max_id: Option<RecordId>, live: u64) -> CoreResult<Counter> {
        let _guard = self.locks.acquire(&self.lock_key);
        let mut counter = self.read_or_initial()?;
        let floor = max_id.map_or(1, |id| id.as_u64() + 1);
        counter.next_id = counter.next_id.max(floor);
        counter.count = live;
        self.write(&counter)?;
        Ok(counter)
    }

    fn update(&self, f: impl FnOnce(&mut Counter)) -> CoreResult<()> {
        let _guard = self.locks.acquire(&self.lock_key);
        let mut counter = self.read()?;
        f(&mut counter);
        self.write(&counter)
    }

    fn read(&self) -> CoreResult<Counter> {
        match self.backend.read(COUNTER_FILE) {
            Ok(data) => Counter::decode(&data),
            Err(e) if e.is_not_found() => {
                Err(CoreError::corrupt_counter("counter file is missing; run init"))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_or_initial(&self) -> CoreResult<Counter> {
        match self.backend.read(COUNTER_FILE) {
            Ok(data) => Counter::decode(&data),
            Err(e) if e.is_not_found() => Ok(Counter::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, counter: &Counter) -> CoreResult<()> {
        self.backend
            .write_atomic(COUNTER_FILE, counter.encode().as_bytes())?;
        Ok(())
    }
}
