// src/cli/handlers/version.rs

use anyhow::Result;

use crate::{constants::PROGRAM_NAME, core::args::ArgStream, CancellationToken};

/// `bulkctl version` — also the cheap always-succeeds job for exercising
/// batch plumbing.
pub fn handle(args: ArgStream, _cancellation_token: &CancellationToken) -> Result<()> {
    args.expect_exhausted()?;
    println!("{} {}", PROGRAM_NAME, env!("CARGO_PKG_VERSION"));
    println!("{} {}", std::env::consts::OS, std::env::consts::ARCH);
    Ok(())
}
