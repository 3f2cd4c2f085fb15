//! `--index` argument parsing.

use filedb_core::IndexConfig;
use std::str::FromStr;
use thiserror::Error;

/// Errors in an `--index` argument.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexArgError {
    /// Nothing before the `!` or `:`.
    #[error("index field name is empty")]
    EmptyField,

    /// `Field:` with an empty include list entry.
    #[error("empty included field in {0:?}")]
    EmptyInclude(String),
}

/// One parsed `Field[!][:Included,...]` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexArg {
    field: String,
    unique: bool,
    include: Vec<String>,
}

impl IndexArg {
    /// Converts into the engine's index configuration.
    pub fn to_config(&self) -> IndexConfig {
        let config = IndexConfig::new(&self.field).include(self.include.iter().cloned());
        if self.unique {
            config.unique()
        } else {
            config
        }
    }
}

impl FromStr for IndexArg {
    type Err = IndexArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, include) = match s.split_once(':') {
            Some((head, list)) => {
                let include = list
                    .split(',')
                    .map(|f| {
                        let f = f.trim();
                        if f.is_empty() {
                            Err(IndexArgError::EmptyInclude(s.to_string()))
                        } else {
                            Ok(f.to_string())
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (head, include)
            }
            None => (s, Vec::new()),
        };

        let (field, unique) = match head.strip_suffix('!') {
            Some(field) => (field, true),
            None => (head, false),
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(IndexArgError::EmptyField);
        }

        Ok(Self {
            field: field.to_string(),
            unique,
            include,
        })
    }
}
