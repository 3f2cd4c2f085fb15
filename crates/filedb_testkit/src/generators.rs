//! Property-based test generators using proptest.
//!
//! Values never contain tab, newline or carriage return, so every generated
//! record can be indexed.

use crate::fixtures::{Page, User};
use filedb_core::RecordId;
use proptest::prelude::*;

/// Strategy for field values that are safe to index, including the empty string.
pub fn field_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 ./@_-]{0,16}").expect("Invalid regex")
}

/// Strategy for non-empty, index-safe names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for users without an ID.
pub fn user_strategy() -> impl Strategy<Value = User> {
    (name_strategy(), name_strategy(), field_value_strategy()).prop_map(|(name, domain, role)| {
        let mut user = User::new(name.clone(), format!("{name}@{domain}.test"));
        user.role = role;
        user
    })
}

/// Strategy for a set of users whose names and emails are all distinct.
pub fn distinct_users_strategy(max: usize) -> impl Strategy<Value = Vec<User>> {
    prop::collection::btree_set(name_strategy(), 0..=max).prop_map(|names| {
        names
            .into_iter()
            .map(|name| User::new(name.clone(), format!("{name}@example.com")))
            .collect()
    })
}

/// Strategy for root pages without an ID.
pub fn page_strategy() -> impl Strategy<Value = Page> {
    (
        name_strategy(),
        field_value_strategy(),
        ".{0,64}",
        any::<bool>(),
    )
        .prop_map(|(slug, title, content, is_pinned)| {
            let mut page = Page::root(format!("/{slug}"), title);
            page.content = content;
            page.is_pinned = is_pinned;
            page
        })
}

/// Strategy for small record IDs, usable as parent references.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    (1u64..64).prop_map(RecordId::new)
}

/// A store operation for model-based tests.
#[derive(Debug, Clone)]
pub enum UserOp {
    /// Insert a user with this name.
    Insert(String),
    /// Rename the n-th live user (modulo the live count).
    Rename(usize, String),
    /// Delete the n-th live user (modulo the live count).
    Delete(usize),
}

/// Strategy for sequences of user operations.
pub fn user_ops_strategy(max: usize) -> impl Strategy<Value = Vec<UserOp>> {
    let op = prop_oneof![
        3 => name_strategy().prop_map(UserOp::Insert),
        1 => (any::<usize>(), name_strategy()).prop_map(|(n, name)| UserOp::Rename(n, name)),
        1 => any::<usize>().prop_map(UserOp::Delete),
    ];
    prop::collection::vec(op, 0..max)
}
