//! Verify command implementation.

use super::Target;
use filedb_core::VerifyReport;

/// Runs the verify command.
///
/// Returns false when the store needs repair.
pub fn run(target: &Target, json: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let store = target.open()?;
    let report = store.verify()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Verifying store at {:?}", target.path);
        println!();
        print_report(&report);
    }
    Ok(report.is_ok())
}

fn print_report(report: &VerifyReport) {
    println!(
        "Records: {} (counter: next id {}, count {})",
        report.records, report.counter.next_id, report.counter.count
    );
    for problem in &report.counter_problems {
        println!("  ✗ {problem}");
    }
    for problem in &report.record_problems {
        println!("  ✗ {problem}");
    }

    for index in &report.indexes {
        if index.is_ok() {
            println!("Index {}: ✓ {} entries", index.field, index.entries);
        } else {
            println!("Index {}: {} problem(s)", index.field, index.problems.len());
            for problem in index.problems.iter().take(20) {
                println!("  ✗ {problem}");
            }
            if index.problems.len() > 20 {
                println!("  ... and {} more", index.problems.len() - 20);
            }
        }
    }

    println!();
    if report.is_ok() {
        println!("✓ Store is consistent");
    } else {
        println!("✗ Store needs repair; run `filedb reindex`");
    }
}
