//! Stress helpers for Waterview.
//!
//! These run many operations, sequentially or from several threads, and
//! report how many succeeded.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use waterview_core::{Connection, DocumentStore, Predicate};

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
        println!("\n=== {} ===", name);
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
    /// Documents per insert batch.
    pub batch_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 100,
            threads: 4,
            batch_size: 1,
        }
    }
}

fn stress_document(thread: usize, op: usize, item: usize) -> serde_json::Value {
    json!({ "thread": thread, "op": op, "item": item })
}

/// Inserts `operations` batches from the calling thread.
pub fn stress_sequential_inserts(
    store: &DocumentStore,
    conn: &Connection,
    collection: &str,
    config: &StressConfig,
) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for op in 0..config.operations {
        let batch = (0..config.batch_size).map(|item| stress_document(0, op, item));
        match store.insert_many(conn, collection, batch) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Inserts from `threads` threads at once, `operations` batches each.
///
/// Every document carries `thread`, `op` and `item` fields, so callers can
/// check that nothing was lost or duplicated.
pub fn stress_concurrent_inserts(
    store: &DocumentStore,
    conn: &Connection,
    collection: &str,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = store.clone();
            let conn = conn.clone();
            let collection = collection.to_string();
            let config = config.clone();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for op in 0..config.operations {
                    let batch = (0..config.batch_size).map(|item| stress_document(t, op, item));
                    match store.insert_many(&conn, &collection, batch) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Runs readers and writers against one collection at once.
///
/// Half the threads (at least one) insert; the rest run `get_where` and
/// `get_all`. A read that sees a non-array or fails counts as a failure.
pub fn stress_mixed_operations(
    store: &DocumentStore,
    conn: &Connection,
    collection: &str,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let writers = (config.threads / 2).max(1);
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads.max(2))
        .map(|t| {
            let store = store.clone();
            let conn = conn.clone();
            let collection = collection.to_string();
            let operations = config.operations;
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                let predicate = Predicate::all().with("thread", 0);
                for op in 0..operations {
                    let ok = if t < writers {
                        store
                            .insert(&conn, &collection, stress_document(t, op, 0))
                            .is_ok()
                    } else if op % 2 == 0 {
                        store.get_where(&conn, &collection, &predicate).is_ok()
                    } else {
                        store.get_all(&conn, &collection).is_ok()
                    };
                    if ok {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::scenarios::{self, TEST_COLLECTION};
    use crate::fixtures::TestStore;

    #[test]
    fn sequential_inserts_all_succeed() {
        let store = TestStore::memory();
        let conn = scenarios::populated(&store, 0);
        let config = StressConfig {
            operations: 20,
            threads: 1,
            batch_size: 3,
        };

        let result = stress_sequential_inserts(&store, &conn, TEST_COLLECTION, &config);
        assert_eq!(result.successful_ops, 20);
        assert_eq!(store.get_all(&conn, TEST_COLLECTION).unwrap().len(), 60);
    }

    #[test]
    fn mixed_operations_do_not_fail() {
        let store = TestStore::memory();
        let conn = scenarios::populated(&store, 5);
        let config = StressConfig {
            operations: 25,
            threads: 4,
            batch_size: 1,
        };

        let result = stress_mixed_operations(&store, &conn, TEST_COLLECTION, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(store.get_all(&conn, TEST_COLLECTION).unwrap().len(), 5 + 2 * 25);
    }
}
