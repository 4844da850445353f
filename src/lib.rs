use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Cooperative cancellation flag shared between the batch submitter, the
/// worker pool, and subprocess wait loops.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod io;
pub mod models;
pub mod remote;
pub mod system;
