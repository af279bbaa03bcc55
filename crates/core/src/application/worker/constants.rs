// Worker constants (no magic values)
use std::time::Duration;

/// Minimum spacing between the starts of two sends from one account (4.5s)
pub const DEFAULT_SEND_DELAY_MS: u64 = 4500;

/// Bounded wait for the next queue item before re-checking shutdown (1s)
pub const DEFAULT_QUEUE_POLL_TIMEOUT_MS: u64 = 1000;

/// Bounded wait on the result channel before emitting an idle snapshot (2s)
pub const DEFAULT_RESULT_POLL_TIMEOUT_MS: u64 = 2000;

/// Upper bound on accounts used in one run
pub const DEFAULT_MAX_ACCOUNTS: usize = 50;

/// Grace period when joining a worker that already reported completion
pub const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);
