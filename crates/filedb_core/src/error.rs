//! Error types for filedb core.

use crate::types::RecordId;
use filedb_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in filedb core operations.
///
/// Every error is scoped to the operation that produced it; none of them
/// leaves the store in a state that later operations cannot use.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Record not found.
    #[error("record not found: {id}")]
    NotFound {
        /// The record ID that was not found.
        id: RecordId,
    },

    /// A unique index already holds the value for another record.
    #[error("duplicate key {value:?} for unique index {field}")]
    DuplicateKey {
        /// The indexed field.
        field: String,
        /// The conflicting value.
        value: String,
    },

    /// An indexed or included value contains a reserved delimiter.
    #[error("value {value:?} of field {field} contains a tab or line break")]
    InvalidKey {
        /// The field whose value was rejected.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// A record body could not be decoded.
    #[error("corrupt record {id}: {message}")]
    CorruptRecord {
        /// The record whose body is corrupt.
        id: RecordId,
        /// Description of the corruption.
        message: String,
    },

    /// An index side file could not be parsed.
    #[error("corrupt index {field}: {message}")]
    CorruptIndex {
        /// The indexed field.
        field: String,
        /// Description of the corruption.
        message: String,
    },

    /// The counter file could not be parsed.
    #[error("corrupt counter: {message}")]
    CorruptCounter {
        /// Description of the corruption.
        message: String,
    },

    /// A query named a field that has no configured index.
    #[error("no index configured for field {field}")]
    UnknownIndex {
        /// The requested field.
        field: String,
    },

    /// The record type cannot project a configured field.
    #[error("record type has no field {field}")]
    UnknownField {
        /// The missing field.
        field: String,
    },

    /// Insert was called with a record that already carries an ID.
    #[error("record already has id {id}; use update")]
    IdAlreadyAssigned {
        /// The ID carried by the record.
        id: RecordId,
    },

    /// Update was called with a record that carries no ID.
    #[error("record has no id; use insert")]
    MissingId,

    /// The store or index configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A record body could not be encoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// Another process holds the store's advisory lock.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,
}

impl CoreError {
    /// Creates a corrupt record error.
    pub fn corrupt_record(id: RecordId, message: impl Into<String>) -> Self {
        Self::CorruptRecord {
            id,
            message: message.into(),
        }
    }

    /// Creates a corrupt index error.
    pub fn corrupt_index(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptIndex {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a corrupt counter error.
    pub fn corrupt_counter(message: impl Into<String>) -> Self {
        Self::CorruptCounter {
            message: message.into(),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidKey {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Returns true for [`CoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for [`CoreError::DuplicateKey`].
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Returns true for [`CoreError::CorruptIndex`].
    #[must_use]
    pub fn is_corrupt_index(&self) -> bool {
        matches!(self, Self::CorruptIndex { .. })
    }
}
