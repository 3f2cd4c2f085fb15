//! Stress helpers for filedb.
//!
//! These drive a store from several threads and report throughput.

use crate::fixtures::{Page, User};
use filedb_core::{CoreError, RecordId, Store};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 100,
            threads: 4,
        }
    }
}

/// Inserts users with distinct names from every thread.
///
/// Returns the result and the assigned IDs.
pub fn stress_concurrent_inserts(
    store: &Store<User>,
    config: &StressConfig,
) -> (StressTestResult, Vec<RecordId>) {
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    let ids: Vec<RecordId> = thread::scope(|s| {
        let handles: Vec<_> = (0..config.threads)
            .map(|t| {
                let failed = &failed;
                s.spawn(move || {
                    let mut ids = Vec::with_capacity(config.operations);
                    for i in 0..config.operations {
                        let name = format!("t{t}-u{i}");
                        let mut user = User::new(name.clone(), format!("{name}@example.com"));
                        match store.insert(&mut user) {
                            Ok(id) => ids.push(id),
                            Err(_) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    ids
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_default())
            .collect()
    });

    let result = StressTestResult::new(ids.len(), failed.into_inner(), start.elapsed());
    (result, ids)
}

/// Every thread tries to insert the same user names.
///
/// Exactly one insert per name should win; the rest fail with
/// [`CoreError::DuplicateKey`]. Returns the result and the number of
/// duplicate rejections.
pub fn stress_contended_unique(store: &Store<User>, config: &StressConfig) -> (StressTestResult, usize) {
    let successful = AtomicUsize::new(0);
    let duplicates = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|s| {
        for _ in 0..config.threads {
            s.spawn(|| {
                for i in 0..config.operations {
                    let name = format!("shared{i}");
                    let mut user = User::new(name.clone(), format!("{name}@example.com"));
                    match store.insert(&mut user) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(CoreError::DuplicateKey { .. }) => {
                            duplicates.fetch_add(1, Ordering::Relaxed)
                        }
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            });
        }
    });

    let result = StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    );
    (result, duplicates.into_inner())
}

/// Mixed workload on a page tree: each thread inserts children of `root`,
/// renames some of them and deletes others, while reading the covering
/// index between writes.
pub fn stress_mixed_pages(
    store: &Store<Page>,
    root: RecordId,
    config: &StressConfig,
) -> StressTestResult {
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();
    let parent = root.to_string();

    thread::scope(|s| {
        for t in 0..config.threads {
            let (successful, failed, parent) = (&successful, &failed, &parent);
            s.spawn(move || {
                let tally = |ok: bool| {
                    if ok {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                };
                for i in 0..config.operations {
                    let mut page = Page::child(root, format!("/t{t}/p{i}"), format!("Page {i}"));
                    if store.insert(&mut page).is_err() {
                        tally(false);
                        continue;
                    }
                    tally(true);

                    match i % 3 {
                        0 => {
                            page.title = format!("Renamed {i}");
                            tally(store.update(&page).is_ok());
                        }
                        1 => {
                            if let Some(id) = page.id {
                                tally(store.delete(id).is_ok());
                            }
                        }
                        _ => tally(store.list_projected("ParentID", parent).is_ok()),
                    }
                }
            });
        }
    });

    StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    )
}
