//! Keyed exclusive locks over named resources.
//!
//! Every shared file of a store (the counter, each index side file, each
//! record body) is guarded by a key of the form `<location>/<file name>`.
//!
//! ## Lifetime discipline
//!
//! The table is reference counted under a single master mutex. A slot is
//! created when the first caller asks for a key and is evicted only when
//! the last holder *or waiter* has dropped out. A waiter therefore always
//! waits on the same slot the current owner holds; it can never observe an
//! empty table and proceed alongside the owner.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Default)]
struct Slot {
    held: bool,
    /// Holders plus waiters.
    refs: usize,
}

/// Grants exclusive, keyed critical sections.
///
/// # Example
///
/// ```rust
/// use filedb_core::LockManager;
///
/// let locks = LockManager::new();
/// {
///     let _guard = locks.acquire("users/counter");
///     // exclusive access to users/counter
/// }
/// assert_eq!(locks.active_keys(), 0);
/// ```
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<HashMap<String, Slot>>,
    released: Condvar,
}

impl LockManager {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide lock table.
    ///
    /// Stores share it so that two handles opened on the same directory
    /// still exclude each other.
    pub fn global() -> Arc<LockManager> {
        static GLOBAL: OnceLock<Arc<LockManager>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(LockManager::new())))
    }

    /// Blocks until the caller holds `key` exclusively.
    ///
    /// The key is released when the returned guard is dropped, including
    /// on early returns and unwinding.
    pub fn acquire(&self, key: &str) -> LockGuard<'_> {
        let mut table = self.table.lock();
        let mut registered = false;

        loop {
            // Our reference keeps the slot alive across waits, so this
            // only inserts on the first pass.
            let slot = table.entry(key.to_string()).or_default();
            if !registered {
                slot.refs += 1;
                registered = true;
            }
            if !slot.held {
                slot.held = true;
                break;
            }
            self.released.wait(&mut table);
        }

        LockGuard {
            manager: self,
            key: key.to_string(),
        }
    }

    /// Returns the number of keys currently held or waited on.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.table.lock().len()
    }

    fn release(&self, key: &str) {
        let mut table = self.table.lock();
        if let Some(slot) = table.get_mut(key) {
            slot.held = false;
            slot.refs -= 1;
            if slot.refs == 0 {
                table.remove(key);
            }
        }
        drop(table);
        self.released.notify_all();
    }
}

/// RAII ownership of one lock key.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<'a> {
    manager: &'a LockManager,
    key: String,
}

impl LockGuard<'_> {
    /// Returns the key held by this guard.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.manager.release(&self.key);
    }
}
