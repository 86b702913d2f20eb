//! Stress helpers for registers.
//!
//! These drive registers under heavy churn and from several threads at once,
//! then check the space accounting.

use crate::fixtures::{create_movie, movie_register, remove_movie, Movie};
use mmapp_core::{EntityId, Register, Transaction};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

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
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Number of movies kept alive between removals.
    pub live_movies: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            live_movies: 64,
        }
    }
}

/// Creates movies and removes the oldest once `live_movies` are stored.
///
/// With lowest-free-id reuse the slot table never grows past
/// `live_movies + 1` slots.
pub fn stress_create_remove_churn(
    register: &Register<Movie>,
    config: &StressConfig,
) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;
    let mut live: VecDeque<EntityId> = VecDeque::new();

    for i in 0..config.operations {
        let result = if live.len() >= config.live_movies {
            match live.pop_front() {
                Some(id) => remove_movie(register, id).map(|_| ()),
                None => Ok(()),
            }
        } else {
            create_movie(register, &format!("Movie {i}"))
                .map(|(movie, _)| live.push_back(movie.id))
        };

        match result {
            Ok(()) => successful += 1,
            Err(err) => {
                warn!(op = i, error = %err, "churn step failed");
                failed += 1;
            }
        }
    }

    let result = StressTestResult::new(successful, failed, start.elapsed());
    debug!(
        ops = result.total_ops,
        failed = result.failed_ops,
        live = live.len(),
        "create/remove churn finished"
    );
    result
}

/// Commits and immediately rolls back creations.
///
/// Every rollback frees the id again, so the register ends as it started.
pub fn stress_create_rollback(
    register: &Register<Movie>,
    config: &StressConfig,
) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let result =
            create_movie(register, &format!("Draft {i}")).and_then(|(_, mut txn)| txn.rollback());
        match result {
            Ok(()) => successful += 1,
            Err(err) => {
                warn!(op = i, error = %err, "create/rollback step failed");
                failed += 1;
            }
        }
    }

    let result = StressTestResult::new(successful, failed, start.elapsed());
    debug!(ops = result.total_ops, failed = result.failed_ops, "create/rollback churn finished");
    result
}

/// Runs creation and removal on clones of one register from several threads.
///
/// Each thread removes only the movies it created itself.
pub fn stress_concurrent_churn(
    register: Register<Movie>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads.max(1);
    let live_per_thread = (config.live_movies / config.threads.max(1)).max(1);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let register = register.clone();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                let mut own = Vec::new();
                for i in 0..ops_per_thread {
                    let result = if own.len() >= live_per_thread {
                        let id = own.swap_remove(i % own.len());
                        remove_movie(&register, id).map(|_| ())
                    } else {
                        create_movie(&register, &format!("T{t} movie {i}"))
                            .map(|(movie, _)| own.push(movie.id))
                    };

                    match result {
                        Ok(()) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            warn!(
                                thread = t,
                                op = i,
                                error = %err,
                                "concurrent churn step failed"
                            );
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    debug!(threads = config.threads, "concurrent churn finished");

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Creates a register for stress runs.
pub fn create_stress_register() -> Register<Movie> {
    movie_register()
}
