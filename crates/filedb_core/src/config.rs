//! Store configuration.

use std::fmt;

/// Serialization used for record body files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// UTF-8 JSON (human readable).
    #[default]
    Json,
    /// CBOR (compact binary).
    Cbor,
}

impl fmt::Display for BodyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Cbor => f.write_str("cbor"),
        }
    }
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to fsync files and the directory before publishing writes.
    pub sync_writes: bool,

    /// Serialization of record bodies.
    pub body_format: BodyFormat,

    /// Whether to hold an advisory lock on `<store>/LOCK` so that no other
    /// process can open the same store.
    pub exclusive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_writes: true,
            body_format: BodyFormat::Json,
            exclusive: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether writes are fsynced.
    #[must_use]
    pub const fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }

    /// Sets the record body format.
    #[must_use]
    pub const fn body_format(mut self, format: BodyFormat) -> Self {
        self.body_format = format;
        self
    }

    /// Sets whether the store is locked against other processes.
    #[must_use]
    pub const fn exclusive(mut self, value: bool) -> Self {
        self.exclusive = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_writes);
        assert!(!config.exclusive);
        assert_eq!(config.body_format, BodyFormat::Json);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_writes(false)
            .body_format(BodyFormat::Cbor)
            .exclusive(true);

        assert!(!config.create_if_missing);
        assert!(!config.sync_writes);
        assert!(config.exclusive);
        assert_eq!(config.body_format, BodyFormat::Cbor);
    }
}
