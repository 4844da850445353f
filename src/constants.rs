// src/constants.rs

/// The invocation name recognized at the start of batch-script lines.
pub const PROGRAM_NAME: &str = "bulkctl";

/// The reserved batch-script keyword that forces a full join point: every
/// job submitted before it must finish before any later job starts.
pub const BARRIER_KEYWORD: &str = "commit-batch";

/// File argument meaning "read from standard input".
pub const STDIN_FILE: &str = "-";

/// The name of the configuration file, looked up in the working directory
/// and then in the user config dir.
pub const CONFIG_FILENAME: &str = "bulkctl.toml";

/// Default worker count for batch execution when not configured.
pub const DEFAULT_MAX_THREADS: usize = 5;

/// Default maximum attempt count for one remote call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Backoff ceiling in seconds between remote-call attempts.
pub const BACKOFF_CAP_SECS: u64 = 60;

/// A progress line is emitted after this many submitted jobs.
pub const PROGRESS_INTERVAL: usize = 100;
