// Dispatch settings (loaded by the CLI, injected into the orchestrator)

use crate::application::worker::constants::*;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of one dispatch run
///
/// Every field has a default, so partial config files deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Cadence floor between task starts of one account (ms)
    pub send_delay_ms: u64,
    /// Bounded wait on a worker's queue (ms)
    pub queue_poll_timeout_ms: u64,
    /// Bounded wait on the result channel (ms)
    pub result_poll_timeout_ms: u64,
    /// Accounts beyond this many are ignored for the run
    pub max_accounts: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            send_delay_ms: DEFAULT_SEND_DELAY_MS,
            queue_poll_timeout_ms: DEFAULT_QUEUE_POLL_TIMEOUT_MS,
            result_poll_timeout_ms: DEFAULT_RESULT_POLL_TIMEOUT_MS,
            max_accounts: DEFAULT_MAX_ACCOUNTS,
        }
    }
}

impl DispatchSettings {
    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }

    pub fn queue_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_poll_timeout_ms)
    }

    pub fn result_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.result_poll_timeout_ms)
    }

    /// Reject settings that would make the loops spin or select nothing
    pub fn validate(&self) -> Result<()> {
        if self.queue_poll_timeout_ms == 0 {
            return Err(AppError::Config(
                "queue_poll_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.result_poll_timeout_ms == 0 {
            return Err(AppError::Config(
                "result_poll_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_accounts == 0 {
            return Err(AppError::Config(
                "max_accounts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
