//! Test fixtures and store helpers.
//!
//! Provides sample record types shaped like the ones a content management
//! application keeps (users and pages), and temporary stores that clean up
//! after themselves.

use filedb_core::{Config, Identify, IndexConfig, Project, Record, RecordId, Store};
use filedb_storage::InMemoryBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Assigned by the store.
    pub id: Option<RecordId>,
    /// Login name, unique.
    pub user_name: String,
    /// Email address, unique.
    pub email: String,
    /// Free-form role.
    pub role: String,
}

impl User {
    /// Creates a user with the `editor` role.
    pub fn new(user_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            user_name: user_name.into(),
            email: email.into(),
            role: "editor".to_string(),
        }
    }
}

impl Identify for User {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }
}

impl Project for User {
    fn project(&self, field: &str) -> Option<String> {
        match field {
            "UserName" => Some(self.user_name.clone()),
            "Email" => Some(self.email.clone()),
            "Role" => Some(self.role.clone()),
            _ => None,
        }
    }
}

/// A page in a tree of pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Assigned by the store.
    pub id: Option<RecordId>,
    /// Parent page; `None` for a root.
    pub parent_id: Option<RecordId>,
    /// Path, unique.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Pinned pages sort first in navigation.
    pub is_pinned: bool,
}

impl Page {
    /// Creates a root page.
    pub fn root(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            parent_id: None,
            url: url.into(),
            title: title.into(),
            content: String::new(),
            is_pinned: false,
        }
    }

    /// Creates a child of `parent`.
    pub fn child(parent: RecordId, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent),
            ..Self::root(url, title)
        }
    }
}

impl Identify for Page {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }
}

impl Project for Page {
    fn project(&self, field: &str) -> Option<String> {
        match field {
            "ParentID" => Some(self.parent_id.map(|id| id.to_string()).unwrap_or_default()),
            "Url" => Some(self.url.clone()),
            "Title" => Some(self.title.clone()),
            "IsPinned" => Some(self.is_pinned.to_string()),
            _ => None,
        }
    }
}

/// Indexes of a user store: unique `UserName` and `Email`.
pub fn user_indexes() -> Vec<IndexConfig> {
    vec![
        IndexConfig::new("UserName").unique(),
        IndexConfig::new("Email").unique(),
    ]
}

/// Indexes of a page store: unique `Url`, covering `ParentID`.
pub fn page_indexes() -> Vec<IndexConfig> {
    vec![
        IndexConfig::new("Url").unique(),
        IndexConfig::new("ParentID").include(["Url", "Title", "IsPinned"]),
    ]
}

/// An initialized store with automatic cleanup.
pub struct TestStore<T: Record> {
    /// The store instance.
    pub store: Store<T>,
    indexes: Vec<IndexConfig>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl<T: Record> TestStore<T> {
    /// Creates an in-memory store.
    pub fn memory(indexes: Vec<IndexConfig>) -> Self {
        let store = Store::open_with_backend(
            Arc::new(InMemoryBackend::new()),
            indexes.clone(),
            Config::default(),
        )
        .expect("Failed to open in-memory store");
        store.init().expect("Failed to initialize store");
        Self {
            store,
            indexes,
            temp_dir: None,
        }
    }

    /// Creates a store in a fresh temporary directory.
    ///
    /// Writes are not fsynced; tests do not survive power loss anyway.
    pub fn file(indexes: Vec<IndexConfig>) -> Self {
        Self::file_with_config(indexes, Config::default().sync_writes(false))
    }

    /// Creates a file store with a custom configuration.
    pub fn file_with_config(indexes: Vec<IndexConfig>, config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Store::open(temp_dir.path(), indexes.clone(), config)
            .expect("Failed to open file store");
        store.init().expect("Failed to initialize store");
        Self {
            store,
            indexes,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Opens a second, initialized handle on the same directory.
    ///
    /// # Panics
    ///
    /// Panics for in-memory stores.
    pub fn reopen(&self) -> Store<T> {
        let path = self.path().expect("Only file stores can be reopened");
        let store = Store::open(path, self.indexes.clone(), Config::default().sync_writes(false))
            .expect("Failed to reopen store");
        store.init().expect("Failed to initialize store");
        store
    }

    /// Returns the names of the files in the store directory, sorted.
    pub fn files(&self) -> Vec<String> {
        let Some(path) = self.path() else {
            return Vec::new();
        };
        let mut names: Vec<String> = std::fs::read_dir(path)
            .expect("Failed to list store directory")
            .filter_map(Result::ok)
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    /// Reads a file of the store directory as text.
    pub fn read_file(&self, name: &str) -> String {
        let path = self.path().expect("Only file stores have files");
        std::fs::read_to_string(path.join(name)).expect("Failed to read store file")
    }
}

impl<T: Record> std::ops::Deref for TestStore<T> {
    type Target = Store<T>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary file-based user store.
pub fn with_user_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore<User>) -> R,
{
    let store = TestStore::file(user_indexes());
    f(&store)
}

/// Runs a test with a temporary file-based page store.
pub fn with_page_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore<Page>) -> R,
{
    let store = TestStore::file(page_indexes());
    f(&store)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a user store holding `count` users named `user<N>`.
    pub fn populated_users(count: usize) -> TestStore<User> {
        let store = TestStore::file(user_indexes());
        for i in 0..count {
            store
                .insert(&mut User::new(format!("user{i}"), format!("user{i}@example.com")))
                .expect("Failed to insert user");
        }
        store
    }

    /// Creates a page tree: one root with `children` child pages.
    ///
    /// Returns the store and the root's ID.
    pub fn page_tree(children: usize) -> (TestStore<Page>, RecordId) {
        let store = TestStore::file(page_indexes());
        let root = store
            .insert(&mut Page::root("/", "Home"))
            .expect("Failed to insert root");
        for i in 0..children {
            store
                .insert(&mut Page::child(root, format!("/p{i}"), format!("Page {i}")))
                .expect("Failed to insert child");
        }
        (store, root)
    }
}
