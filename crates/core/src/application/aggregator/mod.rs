// Result Aggregator - single consumer of the shared result channel

mod errors;
mod progress;

pub use errors::{AccountErrors, ErrorEntry, ErrorReport, ErrorTracker, RECENT_ERRORS_SHOWN};
pub use progress::{
    AccountProgress, AccountProgressLine, AccountStatus, ProgressReport, ProgressTracker,
    PROGRESS_BAR_WIDTH,
};

use crate::application::planner::DistributionPlan;
use crate::domain::{Outcome, ResultMessage, Target};
use crate::port::TimeProvider;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Folds worker messages into progress and error state.
///
/// Owned by one task; never shared across threads.
pub struct Aggregator {
    progress: ProgressTracker,
    errors: ErrorTracker,
    live_workers: usize,
    successes_observed: u64,
    reached: HashSet<Target>,
    planned: Vec<Target>,
    unassigned: Vec<Target>,
}

impl Aggregator {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            progress: ProgressTracker::new(Arc::clone(&time_provider)),
            errors: ErrorTracker::new(time_provider),
            live_workers: 0,
            successes_observed: 0,
            reached: HashSet::new(),
            planned: Vec::new(),
            unassigned: Vec::new(),
        }
    }

    /// Seed planned totals before any worker starts
    pub fn seed(&mut self, plan: &DistributionPlan) {
        let mut seen = HashSet::new();
        for queue in &plan.queues {
            self.progress
                .seed(queue.account.id.clone(), queue.targets.len() as u64);
            for target in &queue.targets {
                if seen.insert(target) {
                    self.planned.push(target.clone());
                }
            }
        }
        self.live_workers = plan.queues.len();
        self.unassigned = plan.unassigned.clone();
    }

    pub fn apply(&mut self, msg: ResultMessage) {
        match msg.outcome {
            Outcome::Success => {
                self.successes_observed += 1;
                self.progress
                    .record_sent(&msg.account_id, msg.running_sent_count);
                if let Some(target) = msg.target {
                    self.reached.insert(target);
                }
            }
            Outcome::Failure(kind) => {
                self.errors
                    .add_error(&msg.account_id, kind, msg.message, msg.target);
            }
            Outcome::Completed(reason) => {
                let first = self.progress.record_completion(
                    &msg.account_id,
                    reason,
                    msg.running_sent_count,
                );
                if first {
                    self.live_workers = self.live_workers.saturating_sub(1);
                }
                debug!(
                    account = %msg.account_id,
                    reason = ?reason,
                    live_workers = self.live_workers,
                    "Worker completion received"
                );
            }
        }
    }

    /// Workers that have not reported completion yet
    pub fn live_workers(&self) -> usize {
        self.live_workers
    }

    pub fn is_finished(&self) -> bool {
        self.live_workers == 0
    }

    pub fn successes_observed(&self) -> u64 {
        self.successes_observed
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn errors(&self) -> &ErrorTracker {
        &self.errors
    }

    pub fn progress_report(&self) -> ProgressReport {
        self.progress.report()
    }

    pub fn error_report(&self) -> ErrorReport {
        self.errors.report()
    }

    pub fn summary_line(&self) -> String {
        self.errors.summary()
    }

    /// Targets no success reached: planned ones that failed or were never
    /// attempted, then the ones the plan left unassigned
    pub fn residual_targets(&self) -> Vec<Target> {
        self.planned
            .iter()
            .filter(|t| !self.reached.contains(*t))
            .chain(self.unassigned.iter())
            .cloned()
            .collect()
    }
}
