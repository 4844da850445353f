// src/system/executor.rs

//! Subprocess execution of one batch job.
//!
//! Each job runs as a separate process image of this same program: one
//! job's crash cannot corrupt another job or the pool. The wait loop is
//! non-blocking so a cancellation request can kill the child promptly.

use crate::CancellationToken;
use std::process::{Command as StdCommand, Stdio};
use std::sync::atomic::Ordering;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("could not locate the running executable: {0}")]
    NoExecutable(std::io::Error),
    #[error("sub-command '{0}' could not be spawned: {1}")]
    SpawnFailed(String, std::io::Error),
    #[error("sub-command '{0}' failed while waiting: {1}")]
    WaitFailed(String, std::io::Error),
    #[error("operation was interrupted by the user")]
    Interrupted,
}

/// Runs one job's argument vector to completion.
///
/// Implementations must be safe to call from multiple worker threads at
/// once. The returned exit code is reported, not judged: a failing job is
/// the job's own business.
pub trait JobRunner: Send + Sync {
    fn run(&self, argv: &[String], cancellation_token: &CancellationToken)
        -> Result<i32, ExecutionError>;
}

/// The real runner: spawns the current executable with the job's argv,
/// inheriting the environment and the terminal.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl JobRunner for ProcessRunner {
    fn run(
        &self,
        argv: &[String],
        cancellation_token: &CancellationToken,
    ) -> Result<i32, ExecutionError> {
        run_job(argv, cancellation_token)
    }
}

/// Spawns one sub-invocation of this program and waits for it, polling the
/// cancellation token. On cancellation the child is killed and reaped.
pub fn run_job(
    argv: &[String],
    cancellation_token: &CancellationToken,
) -> Result<i32, ExecutionError> {
    let exe = std::env::current_exe().map_err(ExecutionError::NoExecutable)?;
    let display = argv.join(" ");

    let mut child = StdCommand::new(&exe)
        .args(argv)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| ExecutionError::SpawnFailed(display.clone(), e))?;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let code = status.code().unwrap_or(-1);
                if code != 0 {
                    log::debug!("sub-command '{}' exited with code {}", display, code);
                }
                return Ok(code);
            }
            Ok(None) => {
                if cancellation_token.load(Ordering::SeqCst) {
                    log::debug!("cancellation requested, killing child (PID {})", child.id());
                    if let Err(e) = child.kill() {
                        log::warn!("failed to kill child process {}: {}", child.id(), e);
                    }
                    child.wait().ok();
                    return Err(ExecutionError::Interrupted);
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(e) => return Err(ExecutionError::WaitFailed(display, e)),
        }
    }
}
