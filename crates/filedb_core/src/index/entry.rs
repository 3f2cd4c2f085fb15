//! Index entries and the side-file line format.
//!
//! One line per record:
//!
//! ```text
//! value \t id \t included1 \t included2 ... \n
//! ```
//!
//! Included values appear in the order the index declares them. Values may
//! be empty but may never contain `\t`, `\n` or `\r`.

use crate::error::{CoreError, CoreResult};
use crate::index::config::IndexConfig;
use crate::record::Project;
use crate::types::RecordId;
use serde::Serialize;
use std::collections::BTreeMap;

const FIELD_DELIMITER: char = '\t';
const LINE_DELIMITER: char = '\n';

/// One row of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IndexEntry {
    /// The record this entry belongs to.
    pub id: RecordId,
    /// The indexed value.
    pub value: String,
    /// Included field values, by field name, as of the last write.
    pub others: BTreeMap<String, String>,
}

impl IndexEntry {
    /// Projects `record` through `index`.
    ///
    /// Fails with [`CoreError::UnknownField`] if the record type lacks a
    /// configured field, or [`CoreError::InvalidKey`] if a value contains a
    /// delimiter.
    pub fn from_record<T: Project>(
        index: &IndexConfig,
        id: RecordId,
        record: &T,
    ) -> CoreResult<Self> {
        let value = project_checked(record, &index.field)?;
        let mut others = BTreeMap::new();
        for field in &index.include {
            others.insert(field.clone(), project_checked(record, field)?);
        }
        Ok(Self { id, value, others })
    }

    /// Returns an included value.
    #[must_use]
    pub fn other(&self, field: &str) -> Option<&str> {
        self.others.get(field).map(String::as_str)
    }

    /// Formats this entry as one terminated line.
    pub(crate) fn to_line(&self, index: &IndexConfig) -> String {
        let mut line = String::with_capacity(self.value.len() + 16);
        line.push_str(&self.value);
        line.push(FIELD_DELIMITER);
        line.push_str(&self.id.to_string());
        for field in &index.include {
            line.push(FIELD_DELIMITER);
            line.push_str(self.other(field).unwrap_or_default());
        }
        line.push(LINE_DELIMITER);
        line
    }

    fn from_line(index: &IndexConfig, line: &str) -> Result<Self, String> {
        let mut columns = line.split(FIELD_DELIMITER);
        let value = columns.next().unwrap_or_default().to_string();
        let id = columns
            .next()
            .ok_or_else(|| format!("missing id in line {line:?}"))?;
        let id: u64 = id
            .parse()
            .map_err(|_| format!("bad id {id:?} in line {line:?}"))?;
        if id == 0 {
            return Err(format!("zero id in line {line:?}"));
        }

        let mut others = BTreeMap::new();
        for field in &index.include {
            let column = columns
                .next()
                .ok_or_else(|| format!("missing {field} in line {line:?}"))?;
            others.insert(field.clone(), column.to_string());
        }
        if columns.next().is_some() {
            return Err(format!("too many columns in line {line:?}"));
        }

        Ok(Self {
            id: RecordId::new(id),
            value,
            others,
        })
    }
}

fn project_checked<T: Project>(record: &T, field: &str) -> CoreResult<String> {
    let value = record
        .project(field)
        .ok_or_else(|| CoreError::UnknownField {
            field: field.to_string(),
        })?;
    if value.contains([FIELD_DELIMITER, LINE_DELIMITER, '\r']) {
        return Err(CoreError::invalid_key(field, value));
    }
    Ok(value)
}

/// Parsed content of a side file.
#[derive(Debug, Default)]
pub(crate) struct ParsedIndex {
    pub entries: Vec<IndexEntry>,
    /// The last line had no terminator: an append that was never finished.
    pub torn_tail: bool,
}

/// Parses a side file.
pub(crate) fn parse(index: &IndexConfig, data: &[u8]) -> CoreResult<ParsedIndex> {
    // A torn append may end mid-character, so split before decoding.
    let (complete, torn_tail) = match data.iter().rposition(|&b| b == b'\n') {
        Some(end) => (&data[..=end], end + 1 < data.len()),
        None => (&data[..0], !data.is_empty()),
    };
    let complete = std::str::from_utf8(complete)
        .map_err(|_| CoreError::corrupt_index(&index.field, "not valid UTF-8"))?;

    let entries = complete
        .split_terminator(LINE_DELIMITER)
        .map(|line| IndexEntry::from_line(index, line))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|message| CoreError::corrupt_index(&index.field, message))?;

    Ok(ParsedIndex { entries, torn_tail })
}

/// Formats a full side file.
pub(crate) fn format(index: &IndexConfig, entries: &[IndexEntry]) -> String {
    entries.iter().map(|e| e.to_line(index)).collect()
}
