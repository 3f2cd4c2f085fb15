//! Model-checked store harness.
//!
//! Mirrors every write in a plain map and compares the store with it.

use crate::fixtures::{user_indexes, TestStore, User};
use crate::generators::UserOp;
use filedb_core::{CoreError, RecordId};
use std::collections::BTreeMap;

/// A user store paired with the state it should hold.
pub struct UserHarness {
    /// The store under test.
    pub store: TestStore<User>,
    model: BTreeMap<RecordId, User>,
}

impl UserHarness {
    /// Creates a harness over a file store.
    pub fn file() -> Self {
        Self {
            store: TestStore::file(user_indexes()),
            model: BTreeMap::new(),
        }
    }

    /// Creates a harness over an in-memory store.
    pub fn memory() -> Self {
        Self {
            store: TestStore::memory(user_indexes()),
            model: BTreeMap::new(),
        }
    }

    /// The live records the store should hold.
    pub fn model(&self) -> &BTreeMap<RecordId, User> {
        &self.model
    }

    fn name_taken(&self, name: &str, except: Option<RecordId>) -> bool {
        self.model
            .values()
            .any(|u| u.user_name == name && u.id != except)
    }

    fn nth_live(&self, n: usize) -> Option<RecordId> {
        if self.model.is_empty() {
            return None;
        }
        self.model.keys().nth(n % self.model.len()).copied()
    }

    /// Applies one operation to the store and the model.
    ///
    /// # Panics
    ///
    /// Panics when the store accepts a write the model rejects or the other
    /// way around.
    pub fn apply(&mut self, op: &UserOp) {
        match op {
            UserOp::Insert(name) => {
                let mut user = User::new(name.clone(), format!("{name}@example.com"));
                let result = self.store.insert(&mut user);
                if self.name_taken(name, None) {
                    assert!(
                        matches!(result, Err(CoreError::DuplicateKey { .. })),
                        "insert of taken name {name:?} gave {result:?}"
                    );
                    assert!(user.id.is_none());
                } else {
                    let id = result.expect("insert failed");
                    self.model.insert(id, user);
                }
            }
            UserOp::Rename(n, name) => {
                let Some(id) = self.nth_live(*n) else { return };
                let mut user = self.model[&id].clone();
                user.user_name = name.clone();
                user.email = format!("{name}@example.com");
                let result = self.store.update(&user);
                if self.name_taken(name, Some(id)) {
                    assert!(
                        matches!(result, Err(CoreError::DuplicateKey { .. })),
                        "rename to taken name {name:?} gave {result:?}"
                    );
                } else {
                    result.expect("update failed");
                    self.model.insert(id, user);
                }
            }
            UserOp::Delete(n) => {
                let Some(id) = self.nth_live(*n) else { return };
                self.store.delete(id).expect("delete failed");
                self.model.remove(&id);
            }
        }
    }

    /// Asserts that the store holds exactly the model.
    ///
    /// # Panics
    ///
    /// Panics on any difference.
    pub fn check(&self) {
        let stored: BTreeMap<RecordId, User> = self
            .store
            .list_all()
            .expect("list_all failed")
            .into_iter()
            .map(|u| (u.id.expect("stored user without id"), u))
            .collect();
        assert_eq!(stored, self.model);

        for (id, user) in &self.model {
            let found = self.store.list("UserName", &user.user_name).expect("list failed");
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, Some(*id));
        }

        let report = self.store.verify().expect("verify failed");
        assert!(report.is_ok(), "store drifted: {report:?}");
        assert_eq!(report.counter.count, self.model.len() as u64);
    }
}

impl Default for UserHarness {
    fn default() -> Self {
        Self::memory()
    }
}
