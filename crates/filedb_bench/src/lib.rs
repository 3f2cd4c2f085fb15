//! Benchmark utilities.

use filedb_core::{Config, RecordId, Store};
use filedb_testkit::{page_indexes, user_indexes, Page, User};
use tempfile::TempDir;

/// Opens a user store in a fresh directory.
///
/// `sync` selects fsync on every write; the directory is removed when the
/// returned guard drops.
pub fn user_store(sync: bool) -> (TempDir, Store<User>) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = Store::open(dir.path(), user_indexes(), Config::default().sync_writes(sync))
        .expect("Failed to open store");
    store.init().expect("Failed to initialize store");
    (dir, store)
}

/// Generates `count` users with distinct names.
pub fn generate_users(prefix: &str, count: usize) -> Vec<User> {
    (0..count)
        .map(|i| User::new(format!("{prefix}{i}"), format!("{prefix}{i}@example.com")))
        .collect()
}

/// Opens a page store holding one root and `children` children.
pub fn page_tree(children: usize) -> (TempDir, Store<Page>, RecordId) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = Store::open(dir.path(), page_indexes(), Config::default().sync_writes(false))
        .expect("Failed to open store");
    store.init().expect("Failed to initialize store");
    let root = store
        .insert(&mut Page::root("/", "Home"))
        .expect("Failed to insert root");
    for i in 0..children {
        let mut page = Page::child(root, format!("/p{i}"), format!("Page {i}"));
        page.content = "lorem ipsum ".repeat(64);
        store.insert(&mut page).expect("Failed to insert page");
    }
    (dir, store, root)
}
