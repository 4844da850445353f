// src/errors.rs

//! The closed exit-code set and the mapping from error values onto it.
//!
//! Every failure category has exactly one small positive exit code, and
//! the most specific applicable code wins over a generic failure. Scripts
//! drive this tool in bulk and branch on these codes; treat them as API.

use crate::config::ConfigError;
use crate::core::args::UsageError;
use crate::core::batch::BatchError;
use crate::core::pool::PoolError;
use crate::core::template::TemplateError;
use crate::io::csv_reader::CsvError;
use crate::remote::retry::RemoteError;
use crate::system::executor::ExecutionError;

pub const EXIT_OK: i32 = 0;
/// Generic failure with no more specific category.
pub const EXIT_GENERAL_ERROR: i32 = 1;
/// Malformed, missing, or extraneous arguments; bad template syntax.
pub const EXIT_USAGE_ERROR: i32 = 2;
/// File I/O, encoding, or configuration failure.
pub const EXIT_FILE_ERROR: i32 = 3;
/// Remote API error that survived the retry policy.
pub const EXIT_API_ERROR: i32 = 4;
/// Transport failure after the retry budget.
pub const EXIT_NETWORK_ERROR: i32 = 5;
/// The process ran out of memory.
pub const EXIT_OUT_OF_MEMORY: i32 = 7;
/// Operator interrupt.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Maps an error chain to the most specific exit code.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    // Out-of-memory outranks the category of whichever wrapper carried it.
    for cause in error.chain() {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::OutOfMemory {
                return EXIT_OUT_OF_MEMORY;
            }
        }
    }

    for cause in error.chain() {
        if cause.downcast_ref::<UsageError>().is_some() {
            return EXIT_USAGE_ERROR;
        }
        if cause.downcast_ref::<TemplateError>().is_some() {
            return EXIT_USAGE_ERROR;
        }
        if let Some(batch) = cause.downcast_ref::<BatchError>() {
            return match batch {
                BatchError::Io(_) | BatchError::Csv(_) => EXIT_FILE_ERROR,
                _ => EXIT_USAGE_ERROR,
            };
        }
        if cause.downcast_ref::<CsvError>().is_some() {
            return EXIT_FILE_ERROR;
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return EXIT_FILE_ERROR;
        }
        if let Some(pool) = cause.downcast_ref::<PoolError>() {
            return match pool {
                PoolError::Interrupted => EXIT_INTERRUPTED,
                PoolError::WorkerStopped => EXIT_GENERAL_ERROR,
            };
        }
        if let Some(exec) = cause.downcast_ref::<ExecutionError>() {
            return match exec {
                ExecutionError::Interrupted => EXIT_INTERRUPTED,
                _ => EXIT_FILE_ERROR,
            };
        }
        if let Some(remote) = cause.downcast_ref::<RemoteError>() {
            return match remote {
                RemoteError::Network { .. } => EXIT_NETWORK_ERROR,
                RemoteError::Api { .. } => EXIT_API_ERROR,
            };
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return EXIT_FILE_ERROR;
        }
    }
    EXIT_GENERAL_ERROR
}

// MARK: --- UNIT TESTS ---
