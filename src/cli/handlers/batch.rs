// src/cli/handlers/batch.rs

//! `bulkctl batch <file> [charset <name>]`
//!
//! Compiles a batch script into jobs and runs them through the worker
//! pool. Each effective script line is either a full `bulkctl` command or
//! the barrier keyword on its own.

use anyhow::Result;

use crate::{
    cli::handlers::commons,
    config,
    core::{
        args::ArgStream,
        batch as compiler,
        pool::{self, PoolOptions},
    },
    system::executor::ProcessRunner,
    CancellationToken,
};

pub fn handle(mut args: ArgStream, cancellation_token: &CancellationToken) -> Result<()> {
    let config = config::load()?;

    let path = args.read_string("batch file")?;
    let _charset = commons::read_charset(&mut args, &config)?;
    args.expect_exhausted()?;

    let input = commons::open_batch_input(&path, &config, &args)?;
    let (jobs, total) = compiler::compile_script(input)?;
    log::debug!("compiled {} jobs from \"{}\"", total, path);

    let runner = ProcessRunner;
    pool::run_batch(
        &jobs,
        total,
        &runner,
        cancellation_token,
        &PoolOptions { max_threads: config.max_threads },
    )?;
    Ok(())
}
