// src/remote/retry.rs

//! The per-call retry/backoff state machine.
//!
//! Every remote call goes through [`invoke_with_retry`] with a call-site
//! [`RetryPolicy`]. A failure resolves to one of four dispositions:
//! return a typed error the caller handles locally (`throw_kinds`), wait
//! and retry (transient kinds plus `retry_kinds`), soft-fail with a
//! warning and no result (`soft_errors`), or surface a fatal error the
//! binary maps to a process exit code.

use crate::constants::{BACKOFF_CAP_SECS, DEFAULT_MAX_ATTEMPTS};
use crate::remote::classify::{self, ErrorKind};
use crate::remote::client::{ClientError, RemoteClient};
use colored::Colorize;
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Call failures that survive the retry policy.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport never recovered within the attempt budget. The binary
    /// maps this to the network exit code.
    #[error("network failure calling {method} after {attempts} attempts: {detail}")]
    Network {
        method: String,
        attempts: u32,
        detail: String,
    },
    /// A classified application error: either a kind the call site asked
    /// to receive (`throw_kinds`), or a fatal kind after policy ran out.
    #[error("API error calling {method}: {kind}: {message}")]
    Api {
        method: String,
        kind: ErrorKind,
        message: String,
    },
}

impl RemoteError {
    /// The classified kind, if this is an application error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api { kind, .. } => Some(*kind),
            Self::Network { .. } => None,
        }
    }
}

/// Per-call-site retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Kinds returned to the caller as a typed [`RemoteError::Api`] on
    /// first occurrence, consuming no retry attempts.
    pub throw_kinds: Vec<ErrorKind>,
    /// Kinds retried in addition to the default transient set.
    pub retry_kinds: Vec<ErrorKind>,
    /// Exhausted or non-retryable failures print a warning and yield
    /// `Ok(None)` instead of an error.
    pub soft_errors: bool,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            throw_kinds: Vec::new(),
            retry_kinds: Vec::new(),
            soft_errors: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn throwing(mut self, kinds: &[ErrorKind]) -> Self {
        self.throw_kinds.extend_from_slice(kinds);
        self
    }

    pub fn retrying(mut self, kinds: &[ErrorKind]) -> Self {
        self.retry_kinds.extend_from_slice(kinds);
        self
    }

    pub fn soft(mut self) -> Self {
        self.soft_errors = true;
        self
    }
}

/// Invokes `method` under `policy`, sleeping between attempts.
///
/// `Ok(Some(payload))` on success, `Ok(None)` on a soft failure,
/// `Err` otherwise.
pub fn invoke_with_retry(
    client: &dyn RemoteClient,
    method: &str,
    params: &Value,
    policy: &RetryPolicy,
) -> Result<Option<Value>, RemoteError> {
    invoke_with_retry_using(client, method, params, policy, &mut |delay| {
        std::thread::sleep(delay);
    })
}

/// The retry loop with an injected sleeper, so tests can observe delays
/// without waiting for them.
pub fn invoke_with_retry_using(
    client: &dyn RemoteClient,
    method: &str,
    params: &Value,
    policy: &RetryPolicy,
    sleep: &mut dyn FnMut(Duration),
) -> Result<Option<Value>, RemoteError> {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match client.invoke(method, params) {
            Ok(payload) => return Ok(Some(payload)),
            Err(ClientError::Transport { detail, .. }) => {
                if attempt >= max_attempts {
                    if policy.soft_errors {
                        soft_warn(method, &format!("network failure: {}", detail));
                        return Ok(None);
                    }
                    return Err(RemoteError::Network {
                        method: method.to_string(),
                        attempts: attempt,
                        detail,
                    });
                }
                log::debug!(
                    "transport failure calling {} (attempt {}/{}): {}",
                    method,
                    attempt,
                    max_attempts,
                    detail
                );
                sleep(backoff_delay(attempt));
            }
            Err(ClientError::Api { status, reason, message, .. }) => {
                let kind = classify::classify(status, &reason, &message);

                if policy.throw_kinds.contains(&kind) {
                    return Err(RemoteError::Api {
                        method: method.to_string(),
                        kind,
                        message,
                    });
                }

                let retryable =
                    classify::is_transient(kind) || policy.retry_kinds.contains(&kind);
                if retryable && attempt < max_attempts {
                    log::debug!(
                        "{} calling {} (attempt {}/{}), backing off",
                        kind,
                        method,
                        attempt,
                        max_attempts
                    );
                    sleep(backoff_delay(attempt));
                    continue;
                }

                if policy.soft_errors {
                    soft_warn(method, &format!("{}: {}", kind, message));
                    return Ok(None);
                }
                return Err(RemoteError::Api {
                    method: method.to_string(),
                    kind,
                    message,
                });
            }
        }
    }
    unreachable!("retry loop always returns within max_attempts")
}

fn soft_warn(method: &str, detail: &str) {
    log::warn!("soft failure calling {}: {}", method, detail);
    eprintln!("{} {}: {}", "WARNING:".yellow().bold(), method, detail);
}

/// Backoff before the next attempt: `min(2^attempt, 60)` seconds plus a
/// sub-second jitter term so many concurrent sub-commands do not retry in
/// lockstep.
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = if attempt >= 6 { BACKOFF_CAP_SECS } else { 1u64 << attempt };
    Duration::from_secs(secs) + jitter()
}

// The pack carries no randomness crate; the clock's sub-second component
// is enough to decorrelate concurrent retries.
fn jitter() -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    Duration::from_millis(u64::from(nanos % 1000))
}

// MARK: --- UNIT TESTS ---
