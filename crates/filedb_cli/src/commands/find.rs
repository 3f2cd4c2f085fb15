//! Find command implementation.

use super::Target;
use filedb_core::RecordId;

/// Runs the find command.
pub fn run(target: &Target, id: u64) -> Result<(), Box<dyn std::error::Error>> {
    let store = target.open()?;
    let record = store.find(RecordId::new(id))?;
    println!("{}", serde_json::to_string_pretty(&record.into_value())?);
    Ok(())
}
