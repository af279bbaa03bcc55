// Error Tracker - failed tasks per account

use crate::domain::{AccountId, ErrorKind, Target};
use crate::port::TimeProvider;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Errors shown per account in a report
pub const RECENT_ERRORS_SHOWN: usize = 3;

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    pub message: String,
    pub target: Option<Target>,
    pub timestamp_ms: i64,
}

/// Append-only error log, grouped by account in first-error order
pub struct ErrorTracker {
    order: Vec<AccountId>,
    entries: HashMap<AccountId, Vec<ErrorEntry>>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ErrorTracker {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
            time_provider,
        }
    }

    pub fn add_error(
        &mut self,
        account_id: &AccountId,
        kind: ErrorKind,
        message: impl Into<String>,
        target: Option<Target>,
    ) {
        let entry = ErrorEntry {
            kind,
            message: message.into(),
            target,
            timestamp_ms: self.time_provider.now_millis(),
        };
        match self.entries.get_mut(account_id) {
            Some(list) => list.push(entry),
            None => {
                self.order.push(account_id.clone());
                self.entries.insert(account_id.clone(), vec![entry]);
            }
        }
    }

    pub fn errors_for(&self, account_id: &AccountId) -> &[ErrorEntry] {
        self.entries
            .get(account_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_errors(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn accounts_with_errors(&self) -> usize {
        self.order.len()
    }

    /// Distinct targets with at least one failure, in first-failure order
    pub fn failed_targets(&self) -> Vec<Target> {
        let mut seen = HashSet::new();
        self.order
            .iter()
            .flat_map(|id| self.errors_for(id))
            .filter_map(|e| e.target.as_ref())
            .filter(|t| seen.insert((*t).clone()))
            .cloned()
            .collect()
    }

    pub fn report(&self) -> ErrorReport {
        let accounts = self
            .order
            .iter()
            .map(|id| {
                let list = self.errors_for(id);
                let skip = list.len().saturating_sub(RECENT_ERRORS_SHOWN);
                AccountErrors {
                    account_id: id.clone(),
                    error_count: list.len(),
                    recent: list[skip..].to_vec(),
                }
            })
            .collect();

        ErrorReport {
            accounts,
            total_errors: self.total_errors(),
        }
    }

    /// `No errors` or `Total: N errors across M accounts`
    pub fn summary(&self) -> String {
        match self.total_errors() {
            0 => "No errors".to_string(),
            total => format!(
                "Total: {} errors across {} accounts",
                total,
                self.accounts_with_errors()
            ),
        }
    }
}

/// Errors of one account, most recent last
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountErrors {
    pub account_id: AccountId,
    pub error_count: usize,
    pub recent: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub accounts: Vec<AccountErrors>,
    pub total_errors: usize,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.accounts.is_empty() {
            return write!(f, "No errors yet");
        }

        let mut first = true;
        for account in &self.accounts {
            if !first {
                writeln!(f)?;
            }
            first = false;

            write!(f, "{} ({} errors)", account.account_id, account.error_count)?;
            for entry in &account.recent {
                write!(
                    f,
                    "\n  {} - {}: {}",
                    format_clock(entry.timestamp_ms),
                    entry.kind.display_name(),
                    entry.message
                )?;
            }
        }
        Ok(())
    }
}

fn format_clock(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}
