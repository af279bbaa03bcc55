//! Distribution Planner - computes each account's task queue
//!
//! - broadcast: every account gets the whole target list, cap ignored
//! - partition: near-equal contiguous split (remainder-first), then capped
//!
//! Pure computation: same inputs always give the same plan.

use crate::domain::{Account, DispatchMode, Target};
use tracing::{debug, warn};

/// Planned queue for one account
#[derive(Debug, Clone)]
pub struct AccountQueue {
    pub account: Account,
    pub targets: Vec<Target>,
}

/// Result of planning a run
#[derive(Debug, Clone, Default)]
pub struct DistributionPlan {
    /// One entry per account, in input order
    pub queues: Vec<AccountQueue>,
    /// Targets no account received (partition mode with a tight cap)
    pub unassigned: Vec<Target>,
}

impl DistributionPlan {
    /// Total number of tasks the workers will attempt
    pub fn total_dispatched(&self) -> usize {
        self.queues.iter().map(|q| q.targets.len()).sum()
    }

    /// Queue lengths in account order
    pub fn queue_lengths(&self) -> Vec<usize> {
        self.queues.iter().map(|q| q.targets.len()).collect()
    }
}

/// Plan per-account queues
///
/// # Arguments
/// * `targets` - Global, already validated target list
/// * `accounts` - Accounts selected for this run
/// * `mode` - Broadcast or partition
/// * `cap` - Max targets per account in partition mode (`<= 0` assigns nothing)
pub fn plan(
    targets: &[Target],
    accounts: &[Account],
    mode: DispatchMode,
    cap: i64,
) -> DistributionPlan {
    if accounts.is_empty() {
        debug!("No accounts selected, empty plan");
        return DistributionPlan {
            queues: Vec::new(),
            unassigned: targets.to_vec(),
        };
    }

    let plan = match mode {
        DispatchMode::Broadcast => broadcast(targets, accounts),
        DispatchMode::Partition => partition(targets, accounts, cap),
    };

    if !plan.unassigned.is_empty() {
        // Truncation is current product behavior, surfaced rather than fixed
        warn!(
            unassigned = plan.unassigned.len(),
            cap = cap,
            accounts = accounts.len(),
            "Per-account cap leaves targets unassigned"
        );
    }

    debug!(
        mode = %mode,
        lengths = ?plan.queue_lengths(),
        "Distribution planned"
    );
    plan
}

fn broadcast(targets: &[Target], accounts: &[Account]) -> DistributionPlan {
    DistributionPlan {
        queues: accounts
            .iter()
            .map(|account| AccountQueue {
                account: account.clone(),
                targets: targets.to_vec(),
            })
            .collect(),
        unassigned: Vec::new(),
    }
}

fn partition(targets: &[Target], accounts: &[Account], cap: i64) -> DistributionPlan {
    let cap = usize::try_from(cap.max(0)).unwrap_or(usize::MAX);
    let n = accounts.len();
    let base = targets.len() / n;
    let remainder = targets.len() % n;

    let mut queues = Vec::with_capacity(n);
    let mut start = 0;
    for (i, account) in accounts.iter().enumerate() {
        let fair_share = base + usize::from(i < remainder);
        let count = fair_share.min(cap);
        let end = start + count;
        queues.push(AccountQueue {
            account: account.clone(),
            targets: targets[start..end].to_vec(),
        });
        start = end;
    }

    DistributionPlan {
        queues,
        unassigned: targets[start..].to_vec(),
    }
}
