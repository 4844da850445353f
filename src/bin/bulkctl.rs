// src/bin/bulkctl.rs

use bulkctl::{
    cli::{dispatcher, Cli},
    errors, CancellationToken,
};
use clap::Parser;
use colored::Colorize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// The main entry point.
///
/// Sets up logging, hands the raw token stream to the dispatcher, and
/// performs centralized error handling: every failure category maps to
/// its own exit code, and interrupts exit silently the way a shell user
/// expects.
fn main() {
    let cancellation_token: CancellationToken = Arc::new(AtomicBool::new(false));
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = dispatcher::dispatch(cli.args, &cancellation_token) {
        let code = errors::exit_code_for(&e);
        if code == errors::EXIT_INTERRUPTED {
            std::process::exit(code);
        }
        eprintln!("\n{}: {}", "ERROR".red().bold(), e);
        std::process::exit(code);
    }
}
