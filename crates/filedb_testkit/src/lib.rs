//! # filedb Testkit
//!
//! Test utilities for filedb.
//!
//! This crate provides:
//! - Temporary stores (file-backed and in-memory)
//! - Sample record types (`User`, `Page`) with their index declarations
//! - Property-based test generators using proptest
//! - A model-checked harness that compares a store with a plain map
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use filedb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     let users = TestStore::<User>::file(user_indexes());
//!     users.insert(&mut User::new("alice", "a@x.com")).unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
