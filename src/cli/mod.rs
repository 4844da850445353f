// src/cli/mod.rs

use clap::Parser;

pub mod dispatcher;
pub mod handlers;

/// bulkctl: run directory administration commands, singly or in bulk.
///
/// The real grammar lives in the dispatcher and the per-command handlers;
/// clap only collects the raw token stream (and provides `--help` /
/// `--version`).
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The command tokens, e.g. `info user someone@example.com`.
    #[arg()]
    pub args: Vec<String>,
}
