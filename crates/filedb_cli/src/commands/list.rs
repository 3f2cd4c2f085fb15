//! List command implementation.

use super::Target;

/// Runs the list command.
///
/// Prints one JSON object per entry.
pub fn run(
    target: &Target,
    field: &str,
    value: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = target.open()?;
    let entries = match value {
        Some(value) => store.list_projected(field, value)?,
        None => store.list_all_projected(field)?,
    };
    for entry in &entries {
        println!("{}", serde_json::to_string(entry)?);
    }
    Ok(())
}
