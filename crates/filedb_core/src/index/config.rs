//! Index configuration.

use crate::error::{CoreError, CoreResult};
use std::collections::HashSet;

/// Declares one secondary index of a store.
///
/// Declared once when the store is opened and immutable afterwards.
///
/// # Example
///
/// ```rust
/// use filedb_core::IndexConfig;
///
/// let by_url = IndexConfig::new("Url").unique();
/// let by_parent = IndexConfig::new("ParentID").include(["Url", "Title"]);
///
/// assert!(by_url.unique);
/// assert_eq!(by_parent.include, vec!["Url", "Title"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// The indexed field.
    pub field: String,
    /// Whether values must be distinct across records.
    pub unique: bool,
    /// Fields projected into every entry, in column order.
    pub include: Vec<String>,
}

impl IndexConfig {
    /// Creates a non-unique index on `field` with no included fields.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: false,
            include: Vec::new(),
        }
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the included (covering) fields.
    #[must_use]
    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the name of the side file, `idx_<field>.idx`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("idx_{}.idx", self.field)
    }

    /// Checks this index on its own.
    pub fn validate(&self) -> CoreResult<()> {
        validate_field_name(&self.field)?;

        let mut seen = HashSet::new();
        for name in &self.include {
            validate_field_name(name)?;
            if *name == self.field {
                return Err(CoreError::invalid_config(format!(
                    "index {} includes its own field",
                    self.field
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(CoreError::invalid_config(format!(
                    "index {} includes {name} twice",
                    self.field
                )));
            }
        }
        Ok(())
    }

    /// Checks a store's full index list.
    pub fn validate_all(indexes: &[IndexConfig]) -> CoreResult<()> {
        let mut fields = HashSet::new();
        for index in indexes {
            index.validate()?;
            if !fields.insert(index.field.as_str()) {
                return Err(CoreError::invalid_config(format!(
                    "field {} is indexed twice",
                    index.field
                )));
            }
        }
        Ok(())
    }
}

/// Field names end up in file names and in tab-separated lines.
fn validate_field_name(name: &str) -> CoreResult<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(CoreError::invalid_config(format!(
            "invalid field name {name:?}"
        )))
    }
}
