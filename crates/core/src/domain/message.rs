// Result Message Domain Model (worker → aggregator)

use super::account::AccountId;
use super::dispatch::Target;
use super::error_kind::ErrorKind;
use serde::{Deserialize, Serialize};

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    /// Stop marker consumed after the whole queue
    Drained,
    /// Internal fault ended the worker before the stop marker
    WorkerError,
    /// Shutdown was requested between tasks
    Cancelled,
}

/// Outcome carried by a [`ResultMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failure(ErrorKind),
    Completed(StopReason),
}

/// Unit of information flowing from a worker to the aggregator.
///
/// Produced by exactly one worker, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub account_id: AccountId,
    pub target: Option<Target>,
    pub outcome: Outcome,
    pub message: String,
    pub running_sent_count: u64,
}

impl ResultMessage {
    pub fn success(
        account_id: AccountId,
        target: Target,
        message: impl Into<String>,
        running_sent_count: u64,
    ) -> Self {
        Self {
            account_id,
            target: Some(target),
            outcome: Outcome::Success,
            message: message.into(),
            running_sent_count,
        }
    }

    pub fn failure(
        account_id: AccountId,
        target: Option<Target>,
        kind: ErrorKind,
        message: impl Into<String>,
        running_sent_count: u64,
    ) -> Self {
        Self {
            account_id,
            target,
            outcome: Outcome::Failure(kind),
            message: message.into(),
            running_sent_count,
        }
    }

    pub fn completed(account_id: AccountId, reason: StopReason, running_sent_count: u64) -> Self {
        let message = format!(
            "Account {} completed with {} emails sent",
            account_id, running_sent_count
        );
        Self {
            account_id,
            target: None,
            outcome: Outcome::Completed(reason),
            message,
            running_sent_count,
        }
    }
}
