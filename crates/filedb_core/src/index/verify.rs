//! Consistency reports.

use crate::counter::Counter;
use crate::index::entry::{IndexEntry, ParsedIndex};
use crate::index::config::IndexConfig;
use crate::types::RecordId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A disagreement between an index side file and the records on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexProblem {
    /// A live record has no entry.
    MissingEntry {
        /// The record.
        id: RecordId,
    },
    /// The entry no longer matches the record's projection.
    StaleEntry {
        /// The record.
        id: RecordId,
    },
    /// The entry points at a record that does not exist.
    OrphanEntry {
        /// The missing record.
        id: RecordId,
    },
    /// The same record appears on more than one line.
    DuplicateEntry {
        /// The record.
        id: RecordId,
    },
    /// A unique index holds the same value for several records.
    DuplicateValue {
        /// The shared value.
        value: String,
        /// The records sharing it, ascending.
        ids: Vec<RecordId>,
    },
    /// The last line is not terminated.
    TornTail,
    /// The side file is missing or cannot be parsed.
    Unreadable {
        /// Why it could not be read.
        message: String,
    },
}

impl fmt::Display for IndexProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEntry { id } => write!(f, "record {id} has no entry"),
            Self::StaleEntry { id } => write!(f, "entry for record {id} is stale"),
            Self::OrphanEntry { id } => write!(f, "entry for missing record {id}"),
            Self::DuplicateEntry { id } => write!(f, "record {id} has several entries"),
            Self::DuplicateValue { value, ids } => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "value {value:?} shared by records {}", ids.join(", "))
            }
            Self::TornTail => f.write_str("unterminated last line"),
            Self::Unreadable { message } => write!(f, "unreadable: {message}"),
        }
    }
}

/// Result of checking one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// The indexed field.
    pub field: String,
    /// Complete lines in the side file.
    pub entries: usize,
    /// Everything that disagrees with the records.
    pub problems: Vec<IndexProblem>,
}

impl IndexReport {
    /// Returns true when the side file matches the records exactly.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Result of [`crate::Store::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// The persisted counter.
    pub counter: Counter,
    /// Record bodies on disk.
    pub records: u64,
    /// Highest record ID on disk.
    pub max_id: Option<RecordId>,
    /// One report per configured index, in configuration order.
    pub indexes: Vec<IndexReport>,
    /// Disagreements between the counter and the record files.
    pub counter_problems: Vec<String>,
    /// Record bodies that could not be decoded or projected.
    pub record_problems: Vec<String>,
}

impl VerifyReport {
    /// Returns true when nothing needs repair.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.counter_problems.is_empty()
            && self.record_problems.is_empty()
            && self.indexes.iter().all(IndexReport::is_ok)
    }

    pub(crate) fn check_counter(&mut self) {
        let floor = self.max_id.map_or(1, |id| id.as_u64() + 1);
        if self.counter.next_id < floor {
            self.counter_problems.push(format!(
                "next id {} is not above the highest record id {}",
                self.counter.next_id,
                floor - 1
            ));
        }
        if self.counter.count != self.records {
            self.counter_problems.push(format!(
                "count {} but {} records on disk",
                self.counter.count, self.records
            ));
        }
    }
}

/// Compares a parsed side file with the entries a rebuild would write.
pub(crate) fn compare(
    config: &IndexConfig,
    actual: &ParsedIndex,
    expected: &[IndexEntry],
) -> IndexReport {
    let mut problems = Vec::new();

    let mut by_id: BTreeMap<RecordId, Vec<&IndexEntry>> = BTreeMap::new();
    for entry in &actual.entries {
        by_id.entry(entry.id).or_default().push(entry);
    }
    let wanted: BTreeMap<RecordId, &IndexEntry> = expected.iter().map(|e| (e.id, e)).collect();

    for (id, want) in &wanted {
        match by_id.get(id) {
            None => problems.push(IndexProblem::MissingEntry { id: *id }),
            Some(found) if found.iter().any(|e| e != want) => {
                problems.push(IndexProblem::StaleEntry { id: *id });
            }
            Some(_) => {}
        }
    }
    for (id, found) in &by_id {
        if !wanted.contains_key(id) {
            problems.push(IndexProblem::OrphanEntry { id: *id });
        }
        if found.len() > 1 {
            problems.push(IndexProblem::DuplicateEntry { id: *id });
        }
    }

    if config.unique {
        let mut by_value: BTreeMap<&str, BTreeSet<RecordId>> = BTreeMap::new();
        for entry in &actual.entries {
            by_value.entry(&entry.value).or_default().insert(entry.id);
        }
        for (value, ids) in by_value {
            if ids.len() > 1 {
                problems.push(IndexProblem::DuplicateValue {
                    value: value.to_string(),
                    ids: ids.into_iter().collect(),
                });
            }
        }
    }

    if actual.torn_tail {
        problems.push(IndexProblem::TornTail);
    }

    IndexReport {
        field: config.field.clone(),
        entries: actual.entries.len(),
        problems,
    }
}
