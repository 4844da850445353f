// src/core/pool.rs

//! The bounded worker pool that executes a compiled job list.
//!
//! A fixed number of OS worker threads pull argument vectors from a bounded
//! channel and run each as an independent sub-invocation of this program.
//! The channel capacity equals the worker count, so submission blocks once
//! that many jobs are in flight. A [`Job::Barrier`] is never dispatched to
//! a worker: the submitter waits for every previously submitted job to
//! finish before submitting anything that follows it.
//!
//! Job failures are local to the job. A worker logs an execution error and
//! moves on; nothing here aborts sibling jobs or inspects exit codes.

use crate::constants::PROGRESS_INTERVAL;
use crate::models::Job;
use crate::system::executor::JobRunner;
use crate::CancellationToken;
use colored::Colorize;
use crossbeam_channel::bounded;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("batch execution was interrupted by the user")]
    Interrupted,
    #[error("a worker thread stopped unexpectedly")]
    WorkerStopped,
}

/// Tuning for one `run_batch` invocation.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_threads: usize,
}

/// Executes `jobs` with bounded concurrency. `total` is the number of
/// non-barrier jobs, used for pool sizing and progress reporting.
///
/// Returns when every submitted job has completed. Cancellation stops
/// further submission, drains in-flight jobs, and reports
/// [`PoolError::Interrupted`].
pub fn run_batch(
    jobs: &[Job],
    total: usize,
    runner: &dyn JobRunner,
    cancellation_token: &CancellationToken,
    options: &PoolOptions,
) -> Result<(), PoolError> {
    if total == 0 {
        log::debug!("batch contains no jobs, nothing to run");
        return Ok(());
    }

    let workers = total.min(options.max_threads).max(1);
    log::debug!("starting worker pool: {} workers for {} jobs", workers, total);

    let done = Arc::new((Mutex::new(0usize), Condvar::new()));
    let (tx, rx) = bounded::<Vec<String>>(workers);

    let mut submitted = 0usize;
    let mut outcome = Ok(());

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let done = Arc::clone(&done);
            scope.spawn(move || {
                for argv in rx.iter() {
                    if let Err(e) = runner.run(&argv, cancellation_token) {
                        log::warn!("job '{}' did not complete: {}", argv.join(" "), e);
                    }
                    let (completed, cvar) = &*done;
                    *completed.lock().expect("worker pool mutex poisoned") += 1;
                    cvar.notify_all();
                }
            });
        }
        drop(rx);

        for job in jobs {
            if cancellation_token.load(Ordering::SeqCst) {
                log::warn!("interrupt received, no further jobs will be submitted");
                outcome = Err(PoolError::Interrupted);
                break;
            }
            match job {
                Job::Barrier => wait_for_drain(&done, submitted),
                Job::Command(argv) => {
                    if tx.send(argv.clone()).is_err() {
                        outcome = Err(PoolError::WorkerStopped);
                        break;
                    }
                    submitted += 1;
                    if submitted % PROGRESS_INTERVAL == 0 {
                        eprintln!(
                            "{}",
                            format!("{} of {} jobs submitted", submitted, total).dimmed()
                        );
                    }
                }
            }
        }

        // Closing the channel lets the workers drain and exit; the scope
        // joins them before returning.
        drop(tx);
    });

    if outcome.is_ok() {
        eprintln!("{}", format!("batch complete: {} jobs processed", submitted).dimmed());
    }
    outcome
}

/// Blocks until `submitted` completions have been recorded.
fn wait_for_drain(done: &(Mutex<usize>, Condvar), submitted: usize) {
    let (completed, cvar) = done;
    let mut count = completed.lock().expect("worker pool mutex poisoned");
    while *count < submitted {
        count = cvar.wait(count).expect("worker pool mutex poisoned");
    }
}

// MARK: --- UNIT TESTS ---
