//! Reindex command implementation.

use super::Target;

/// Runs the reindex command.
pub fn run(target: &Target) -> Result<(), Box<dyn std::error::Error>> {
    let store = target.open()?;
    store.reindex()?;

    let counter = store.counter()?;
    println!("Reindexed store at {:?}", target.path);
    println!("  Next ID: {}", counter.next_id);
    println!("  Count:   {}", counter.count);
    for index in store.indexes() {
        println!("  Index {}: {} entries", index.field(), index.entries()?.len());
    }
    Ok(())
}
