//! Inspect command implementation.

use super::Target;
use filedb_core::{Counter, RecordId};
use serde::Serialize;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub path: String,
    /// Persisted counter.
    pub counter: Counter,
    /// Record files on disk.
    pub records: usize,
    /// Highest record ID on disk.
    pub max_id: Option<RecordId>,
    /// One entry per declared index.
    pub indexes: Vec<IndexInfo>,
}

/// Summary of one index side file.
#[derive(Debug, Serialize)]
pub struct IndexInfo {
    /// Indexed field.
    pub field: String,
    /// Whether values must be distinct.
    pub unique: bool,
    /// Included fields.
    pub include: Vec<String>,
    /// Side file name.
    pub file: String,
    /// Complete lines, if the file could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    /// Why the file could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Collects the inspection result without printing it.
pub fn collect(target: &Target) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let store = target.open()?;
    let ids = store.ids()?;

    let indexes = store
        .indexes()
        .iter()
        .map(|index| {
            let config = index.config();
            let (entries, error) = match index.entries() {
                Ok(entries) => (Some(entries.len()), None),
                Err(e) => (None, Some(e.to_string())),
            };
            IndexInfo {
                field: config.field.clone(),
                unique: config.unique,
                include: config.include.clone(),
                file: index.file_name().to_string(),
                entries,
                error,
            }
        })
        .collect();

    Ok(InspectResult {
        path: target.path.display().to_string(),
        counter: store.counter()?,
        records: ids.len(),
        max_id: ids.last().copied(),
        indexes,
    })
}

/// Runs the inspect command.
pub fn run(target: &Target, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(target)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text_output(&result);
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("filedb Store Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Counter:");
    println!("  Next ID: {}", result.counter.next_id);
    println!("  Count:   {}", result.counter.count);
    println!();
    println!("Records:");
    println!("  Files:   {}", result.records);
    match result.max_id {
        Some(id) => println!("  Max ID:  {id}"),
        None => println!("  Max ID:  -"),
    }

    if !result.indexes.is_empty() {
        println!();
        println!("Indexes:");
    }
    for index in &result.indexes {
        let mut flags = Vec::new();
        if index.unique {
            flags.push("unique".to_string());
        }
        if !index.include.is_empty() {
            flags.push(format!("includes {}", index.include.join(", ")));
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join("; "))
        };
        match (&index.entries, &index.error) {
            (Some(n), _) => println!("  {}{flags}: {n} entries", index.field),
            (None, Some(e)) => println!("  {}{flags}: {e}", index.field),
            (None, None) => println!("  {}{flags}", index.field),
        }
    }
}
