//! Concurrent stress helpers.
//!
//! Each worker thread is its own call chain, so these exercise per-chain
//! transaction isolation under contention.

use crate::fixtures::{Person, TestStore};
use docrepo_core::{CoreError, CoreResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total units of work attempted.
    pub total_ops: usize,
    /// Units that committed.
    pub successful_ops: usize,
    /// Units that failed or were rolled back.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        Self {
            total_ops: successful + failed,
            successful_ops: successful,
            failed_ops: failed,
            duration,
        }
    }

    /// Returns committed units per second.
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.successful_ops as f64 / secs
        } else {
            0.0
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Units of work per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Records written per unit of work.
    pub batch_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 100,
            threads: 4,
            batch_size: 3,
        }
    }
}

impl StressConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            operations: 20,
            threads: 4,
            batch_size: 2,
        }
    }
}

/// Runs concurrent transactions that each create a batch of people.
///
/// Every unit at an odd index fails after writing its batch, so only even
/// units may leave records behind: `successful_ops * batch_size` people
/// are expected to be committed afterwards.
pub fn stress_concurrent_batches(store: &TestStore, config: &StressConfig) -> StressTestResult {
    let people = store.people();
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|s| {
        for worker in 0..config.threads {
            let people = &people;
            let successful = &successful;
            let failed = &failed;
            s.spawn(move || {
                for op in 0..config.operations {
                    let result: CoreResult<()> = store.transaction(|| {
                        for n in 0..config.batch_size {
                            let name = format!("w{worker}-op{op}-{n}");
                            people.create(&mut Person::new(name, op as i64))?;
                        }
                        if op % 2 == 1 {
                            return Err(CoreError::config("rollback requested"));
                        }
                        Ok(())
                    });
                    match result {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            });
        }
    });

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Runs concurrent transactions that all rename the same person.
///
/// Concurrent writers to one document conflict at commit; the loser gets
/// a transient write conflict and is counted as failed.
pub fn stress_contended_updates(store: &TestStore, config: &StressConfig) -> StressTestResult {
    let people = store.people();
    let mut target = Person::new("contended", 0);
    people.create(&mut target).expect("failed to seed contended person");

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|s| {
        for worker in 0..config.threads {
            let people = &people;
            let target = &target;
            let successful = &successful;
            let failed = &failed;
            s.spawn(move || {
                for op in 0..config.operations {
                    let mut renamed = target.clone();
                    renamed.name = format!("w{worker}-op{op}");
                    match people.update(&renamed) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(err) => {
                            assert!(err.is_transient(), "unexpected error: {err}");
                            failed.fetch_add(1, Ordering::Relaxed)
                        }
                    };
                }
            });
        }
    });

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
