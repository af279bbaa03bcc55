// Progress Tracker - per-account sent/total/status

use crate::domain::{AccountId, StopReason};
use crate::port::TimeProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Width of the rendered progress bar in characters
pub const PROGRESS_BAR_WIDTH: u64 = 20;

/// Lifecycle of one account as seen by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Sending,
    Completed,
    /// Worker ended early on an internal fault
    Aborted,
    Cancelled,
}

impl AccountStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AccountStatus::Sending)
    }
}

impl From<StopReason> for AccountStatus {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::Drained => AccountStatus::Completed,
            StopReason::WorkerError => AccountStatus::Aborted,
            StopReason::Cancelled => AccountStatus::Cancelled,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Sending => write!(f, "sending"),
            AccountStatus::Completed => write!(f, "completed"),
            AccountStatus::Aborted => write!(f, "aborted"),
            AccountStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Progress of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountProgress {
    pub sent: u64,
    pub total: u64,
    pub status: AccountStatus,
    pub last_update_ms: i64,
}

impl AccountProgress {
    pub fn percentage(&self) -> u64 {
        percentage(self.sent, self.total)
    }
}

fn percentage(sent: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        (sent * 100 / total).min(100)
    }
}

/// Tracks progress per account, in the order accounts were seeded.
///
/// Single writer: only the aggregator mutates it.
pub struct ProgressTracker {
    order: Vec<AccountId>,
    accounts: HashMap<AccountId, AccountProgress>,
    started_at_ms: i64,
    time_provider: Arc<dyn TimeProvider>,
}

impl ProgressTracker {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            order: Vec::new(),
            accounts: HashMap::new(),
            started_at_ms: time_provider.now_millis(),
            time_provider,
        }
    }

    /// Register an account with its planned total before any worker starts
    pub fn seed(&mut self, account_id: AccountId, total: u64) {
        let now = self.time_provider.now_millis();
        if !self.accounts.contains_key(&account_id) {
            self.order.push(account_id.clone());
        }
        self.accounts.insert(
            account_id,
            AccountProgress {
                sent: 0,
                total,
                status: AccountStatus::Sending,
                last_update_ms: now,
            },
        );
    }

    /// Success: `sent` follows the worker's running count, `total` stays as planned
    pub fn record_sent(&mut self, account_id: &AccountId, running_sent_count: u64) {
        let now = self.time_provider.now_millis();
        let entry = self.entry(account_id, running_sent_count);
        entry.sent = running_sent_count;
        entry.last_update_ms = now;
    }

    /// Terminal update. Returns false if the account was already terminal.
    pub fn record_completion(
        &mut self,
        account_id: &AccountId,
        reason: StopReason,
        running_sent_count: u64,
    ) -> bool {
        let now = self.time_provider.now_millis();
        let entry = self.entry(account_id, running_sent_count);
        if entry.status.is_terminal() {
            return false;
        }
        entry.sent = running_sent_count;
        entry.status = AccountStatus::from(reason);
        entry.last_update_ms = now;
        true
    }

    pub fn get(&self, account_id: &AccountId) -> Option<&AccountProgress> {
        self.accounts.get(account_id)
    }

    pub fn total_sent(&self) -> u64 {
        self.accounts.values().map(|p| p.sent).sum()
    }

    pub fn total_planned(&self) -> u64 {
        self.accounts.values().map(|p| p.total).sum()
    }

    pub fn active_accounts(&self) -> usize {
        self.accounts
            .values()
            .filter(|p| !p.status.is_terminal())
            .count()
    }

    /// Pure read of the current state
    pub fn report(&self) -> ProgressReport {
        let accounts: Vec<AccountProgressLine> = self
            .order
            .iter()
            .filter_map(|id| {
                self.accounts.get(id).map(|p| AccountProgressLine {
                    account_id: id.clone(),
                    sent: p.sent,
                    total: p.total,
                    percentage: p.percentage(),
                    status: p.status,
                })
            })
            .collect();

        let total_sent = self.total_sent();
        let total_planned = self.total_planned();
        ProgressReport {
            active_accounts: self.active_accounts(),
            total_accounts: self.order.len(),
            accounts,
            total_sent,
            total_planned,
            overall_percentage: percentage(total_sent, total_planned),
            elapsed_ms: (self.time_provider.now_millis() - self.started_at_ms).max(0),
        }
    }

    // Messages for an unseeded account fall back to total = running count
    fn entry(&mut self, account_id: &AccountId, fallback_total: u64) -> &mut AccountProgress {
        if !self.accounts.contains_key(account_id) {
            self.order.push(account_id.clone());
        }
        let now = self.time_provider.now_millis();
        self.accounts
            .entry(account_id.clone())
            .or_insert_with(|| AccountProgress {
                sent: 0,
                total: fallback_total,
                status: AccountStatus::Sending,
                last_update_ms: now,
            })
    }
}

/// One rendered account line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountProgressLine {
    pub account_id: AccountId,
    pub sent: u64,
    pub total: u64,
    pub percentage: u64,
    pub status: AccountStatus,
}

/// Point-in-time progress view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub active_accounts: usize,
    pub total_accounts: usize,
    pub accounts: Vec<AccountProgressLine>,
    pub total_sent: u64,
    pub total_planned: u64,
    pub overall_percentage: u64,
    pub elapsed_ms: i64,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.accounts.is_empty() {
            return write!(f, "No progress data");
        }

        writeln!(
            f,
            "Progress ({}/{} accounts active)",
            self.active_accounts, self.total_accounts
        )?;
        for line in &self.accounts {
            writeln!(
                f,
                "{}: {} {}/{} ({}%) - {}",
                line.account_id,
                render_bar(line.percentage),
                line.sent,
                line.total,
                line.percentage,
                line.status
            )?;
        }
        write!(
            f,
            "Overall: {}/{} ({}%) - {}",
            self.total_sent,
            self.total_planned,
            self.overall_percentage,
            format_elapsed(self.elapsed_ms)
        )
    }
}

fn render_bar(percentage: u64) -> String {
    let filled = (percentage * PROGRESS_BAR_WIDTH / 100).min(PROGRESS_BAR_WIDTH) as usize;
    let empty = PROGRESS_BAR_WIDTH as usize - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

fn format_elapsed(elapsed_ms: i64) -> String {
    let secs = elapsed_ms / 1000;
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
