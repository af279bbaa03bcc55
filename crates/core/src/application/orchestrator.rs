//! Orchestrator - wires planner, workers and aggregator for one run
//!
//! `run` validates and plans eagerly but spawns nothing: workers start on
//! the first pull of the returned [`DispatchRun`]. Every pull yields one
//! [`Snapshot`]; the last one is terminal and the sequence ends after it.

use crate::application::aggregator::{Aggregator, ErrorReport, ProgressReport};
use crate::application::planner::{plan, DistributionPlan};
use crate::application::settings::DispatchSettings;
use crate::application::worker::constants::WORKER_JOIN_TIMEOUT;
use crate::application::worker::{
    describe_join_error, shutdown_channel, ShutdownSender, ShutdownToken, Worker,
};
use crate::domain::{
    Account, DispatchMode, DispatchRequest, DomainError, QueueItem, ResultMessage, Target,
};
use crate::error::Result;
use crate::port::id_provider::UuidProvider;
use crate::port::{IdProvider, Sender, TargetStore, TimeProvider};
use futures::Stream;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Final log line of every run
pub const ALL_TASKS_COMPLETE: &str = "All tasks complete";

/// One observation of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub log_line: String,
    pub progress: ProgressReport,
    pub errors: ErrorReport,
    pub summary_line: String,
    pub terminal: bool,
}

/// Entry point of the engine
///
/// Sender, target store and clock are injected here; nothing is global.
pub struct Orchestrator {
    sender: Arc<dyn Sender>,
    target_store: Option<Arc<dyn TargetStore>>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    settings: DispatchSettings,
}

impl Orchestrator {
    pub fn new(
        sender: Arc<dyn Sender>,
        time_provider: Arc<dyn TimeProvider>,
        settings: DispatchSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            sender,
            target_store: None,
            time_provider,
            id_provider: Arc::new(UuidProvider),
            settings,
        })
    }

    /// Store notified of reached targets (partition mode only)
    pub fn with_target_store(mut self, store: Arc<dyn TargetStore>) -> Self {
        self.target_store = Some(store);
        self
    }

    pub fn with_id_provider(mut self, id_provider: Arc<dyn IdProvider>) -> Self {
        self.id_provider = id_provider;
        self
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Start a run. Invalid input gives a run whose only snapshot is a
    /// terminal `ERROR:` line.
    pub fn run(&self, request: DispatchRequest) -> DispatchRun {
        let run_id = self.id_provider.generate_id();
        let span = info_span!("dispatch", run_id = %run_id);
        let mut aggregator = Aggregator::new(Arc::clone(&self.time_provider));
        let (shutdown, token) = shutdown_channel();

        let DispatchRequest {
            targets,
            mut accounts,
            mode,
            cap,
        } = request;

        if accounts.len() > self.settings.max_accounts {
            span.in_scope(|| {
                info!(
                    provided = accounts.len(),
                    max_accounts = self.settings.max_accounts,
                    "Using only the first accounts up to the limit"
                )
            });
            accounts.truncate(self.settings.max_accounts);
        }

        if let Err(e) = validate(&targets, &accounts) {
            span.in_scope(|| warn!(error = %e, "Rejected dispatch request"));
            aggregator.seed(&DistributionPlan {
                queues: Vec::new(),
                unassigned: targets,
            });
            return DispatchRun::new(
                run_id,
                span,
                aggregator,
                RunState::Invalid(e.to_string()),
                shutdown,
                self.settings.result_poll_timeout(),
            );
        }

        let distribution = span.in_scope(|| plan(&targets, &accounts, mode, cap));
        aggregator.seed(&distribution);
        span.in_scope(|| {
            info!(
                mode = %mode,
                accounts = distribution.queues.len(),
                dispatched = distribution.total_dispatched(),
                unassigned = distribution.unassigned.len(),
                "Dispatch planned"
            )
        });

        let (results_tx, results_rx) = unbounded_channel();
        let pending = distribution
            .queues
            .into_iter()
            .map(|queue| {
                let mut worker =
                    Worker::new(queue.account, Arc::clone(&self.sender), &self.settings);
                if mode == DispatchMode::Partition {
                    if let Some(store) = &self.target_store {
                        worker = worker.with_target_store(Arc::clone(store));
                    }
                }
                PendingWorker {
                    worker,
                    targets: queue.targets,
                }
            })
            .collect();

        DispatchRun::new(
            run_id,
            span,
            aggregator,
            RunState::Ready(ReadyRun {
                workers: pending,
                results_tx,
                results_rx,
                token,
            }),
            shutdown,
            self.settings.result_poll_timeout(),
        )
    }
}

fn validate(targets: &[Target], accounts: &[Account]) -> std::result::Result<(), DomainError> {
    if accounts.is_empty() {
        return Err(DomainError::NoAccounts);
    }
    if targets.is_empty() {
        return Err(DomainError::NoTargets);
    }
    let mut seen = HashSet::new();
    for account in accounts {
        if !seen.insert(&account.id) {
            return Err(DomainError::DuplicateAccount(account.id.to_string()));
        }
    }
    Ok(())
}

struct PendingWorker {
    worker: Worker,
    targets: Vec<Target>,
}

struct ReadyRun {
    workers: Vec<PendingWorker>,
    results_tx: UnboundedSender<ResultMessage>,
    results_rx: UnboundedReceiver<ResultMessage>,
    token: ShutdownToken,
}

enum RunState {
    Invalid(String),
    Ready(ReadyRun),
    Running {
        results: UnboundedReceiver<ResultMessage>,
        handles: Vec<JoinHandle<u64>>,
    },
    Finished,
}

/// Pull-based sequence of snapshots for one run.
///
/// Owns the aggregator; only the task polling it mutates progress state.
pub struct DispatchRun {
    run_id: String,
    span: Span,
    aggregator: Aggregator,
    state: RunState,
    shutdown: ShutdownSender,
    poll_timeout: Duration,
}

impl DispatchRun {
    fn new(
        run_id: String,
        span: Span,
        aggregator: Aggregator,
        state: RunState,
        shutdown: ShutdownSender,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            run_id,
            span,
            aggregator,
            state,
            shutdown,
            poll_timeout,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Handle that asks every worker to stop before its next task
    pub fn shutdown_handle(&self) -> ShutdownSender {
        self.shutdown.clone()
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Targets not reached by this run, for a follow-up run
    pub fn residual_targets(&self) -> Vec<Target> {
        self.aggregator.residual_targets()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Finished)
    }

    /// Next snapshot, or `None` once the terminal one has been yielded
    pub async fn next(&mut self) -> Option<Snapshot> {
        let span = self.span.clone();
        self.step().instrument(span).await
    }

    pub fn into_stream(self) -> impl Stream<Item = Snapshot> + Send {
        futures::stream::unfold(self, |mut run| async move {
            let snapshot = run.next().await?;
            Some((snapshot, run))
        })
    }

    async fn step(&mut self) -> Option<Snapshot> {
        match std::mem::replace(&mut self.state, RunState::Finished) {
            RunState::Finished => None,
            RunState::Invalid(reason) => Some(self.snapshot(format!("ERROR: {}", reason), true)),
            RunState::Ready(ready) => {
                let (results, handles) = spawn_workers(ready);
                self.poll(results, handles).await
            }
            RunState::Running { results, handles } => self.poll(results, handles).await,
        }
    }

    async fn poll(
        &mut self,
        mut results: UnboundedReceiver<ResultMessage>,
        handles: Vec<JoinHandle<u64>>,
    ) -> Option<Snapshot> {
        if self.aggregator.is_finished() {
            self.finish(results, handles).await;
            return Some(self.snapshot(ALL_TASKS_COMPLETE.to_string(), true));
        }

        match timeout(self.poll_timeout, results.recv()).await {
            Ok(Some(msg)) => self.aggregator.apply(msg),
            Ok(None) => {
                // Every worker dropped its sender without a completion
                error!(
                    live_workers = self.aggregator.live_workers(),
                    "Result channel closed with workers outstanding"
                );
                self.finish(results, handles).await;
                return Some(self.snapshot(ALL_TASKS_COMPLETE.to_string(), true));
            }
            Err(_) => debug!("No result within poll timeout"),
        }

        let log_line = format!(
            "Processing... {} workers active",
            self.aggregator.live_workers()
        );
        self.state = RunState::Running { results, handles };
        Some(self.snapshot(log_line, false))
    }

    async fn finish(
        &mut self,
        mut results: UnboundedReceiver<ResultMessage>,
        handles: Vec<JoinHandle<u64>>,
    ) {
        for handle in handles {
            match timeout(WORKER_JOIN_TIMEOUT, handle).await {
                Ok(Ok(sent)) => debug!(sent, "Worker joined"),
                Ok(Err(e)) => error!(error = %describe_join_error(e), "Worker task failed"),
                Err(_) => warn!("Worker did not stop within join timeout"),
            }
        }
        while let Ok(msg) = results.try_recv() {
            self.aggregator.apply(msg);
        }

        info!(
            sent = self.aggregator.progress().total_sent(),
            errors = self.aggregator.errors().total_errors(),
            "Dispatch finished"
        );
    }

    fn snapshot(&self, log_line: String, terminal: bool) -> Snapshot {
        Snapshot {
            log_line,
            progress: self.aggregator.progress_report(),
            errors: self.aggregator.error_report(),
            summary_line: self.aggregator.summary_line(),
            terminal,
        }
    }
}

fn spawn_workers(ready: ReadyRun) -> (UnboundedReceiver<ResultMessage>, Vec<JoinHandle<u64>>) {
    let ReadyRun {
        workers,
        results_tx,
        results_rx,
        token,
    } = ready;

    let handles: Vec<JoinHandle<u64>> = workers
        .into_iter()
        .map(|PendingWorker { worker, targets }| {
            let (queue_tx, queue_rx) = unbounded_channel();
            for target in targets {
                // Receiver is alive in this scope
                let _ = queue_tx.send(QueueItem::Target(target));
            }
            let _ = queue_tx.send(QueueItem::Stop);

            let results = results_tx.clone();
            let token = token.clone();
            tokio::spawn(
                async move { worker.run(queue_rx, results, token).await }.in_current_span(),
            )
        })
        .collect();

    info!(workers = handles.len(), "Workers started");
    (results_rx, handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::aggregator::AccountStatus;
    use crate::domain::ErrorKind;
    use crate::port::sender::mocks::{MockBehavior, MockSender};
    use crate::port::target_store::MockTargetStore;
    use crate::port::time_provider::FixedTimeProvider;
    use futures::StreamExt;

    fn fast_settings() -> DispatchSettings {
        DispatchSettings {
            send_delay_ms: 0,
            ..Default::default()
        }
    }

    fn orchestrator(sender: Arc<MockSender>) -> Orchestrator {
        Orchestrator::new(sender, Arc::new(FixedTimeProvider(0)), fast_settings()).unwrap()
    }

    fn accounts(n: usize) -> Vec<Account> {
        (0..n)
            .map(|i| Account::new(format!("a{}@example.com", i), "pw"))
            .collect()
    }

    fn targets(n: usize) -> Vec<Target> {
        (0..n)
            .map(|i| Target::new(format!("t{}@test.com", i)))
            .collect()
    }

    fn request(t: usize, a: usize, mode: DispatchMode, cap: i64) -> DispatchRequest {
        DispatchRequest::new(targets(t), accounts(a), mode, cap)
    }

    async fn drain(mut run: DispatchRun) -> (Vec<Snapshot>, DispatchRun) {
        let mut snapshots = Vec::new();
        while let Some(snapshot) = run.next().await {
            snapshots.push(snapshot);
        }
        (snapshots, run)
    }

    fn assert_single_terminal(snapshots: &[Snapshot]) {
        let terminal: Vec<_> = snapshots.iter().filter(|s| s.terminal).collect();
        assert_eq!(terminal.len(), 1);
        assert!(snapshots.last().unwrap().terminal);
    }

    #[tokio::test]
    async fn test_partition_run_sends_everything_once() {
        let sender = Arc::new(MockSender::new_success());
        let run = orchestrator(Arc::clone(&sender)).run(request(5, 2, DispatchMode::Partition, 10));
        let (snapshots, run) = drain(run).await;

        assert_single_terminal(&snapshots);
        let last = snapshots.last().unwrap();
        assert_eq!(last.log_line, ALL_TASKS_COMPLETE);
        assert_eq!(last.progress.total_sent, 5);
        assert_eq!(last.progress.accounts[0].total, 3);
        assert_eq!(last.progress.accounts[1].total, 2);
        assert!(last
            .progress
            .accounts
            .iter()
            .all(|a| a.status == AccountStatus::Completed));
        assert_eq!(last.summary_line, "No errors");
        assert_eq!(sender.call_count(), 5);
        assert!(run.residual_targets().is_empty());
        assert!(run.is_finished());
    }

    #[tokio::test]
    async fn test_broadcast_run_sends_full_list_per_account() {
        let sender = Arc::new(MockSender::new_success());
        let run = orchestrator(Arc::clone(&sender)).run(request(5, 2, DispatchMode::Broadcast, 1));
        let (snapshots, _) = drain(run).await;

        assert_eq!(sender.call_count(), 10);
        assert_eq!(sender.calls_for("a0@example.com"), targets(5));
        assert_eq!(sender.calls_for("a1@example.com"), targets(5));
        assert_eq!(snapshots.last().unwrap().progress.total_sent, 10);
    }

    #[tokio::test]
    async fn test_cap_leaves_residual_targets() {
        let sender = Arc::new(MockSender::new_success());
        let run = orchestrator(Arc::clone(&sender)).run(request(7, 3, DispatchMode::Partition, 2));
        let (snapshots, run) = drain(run).await;

        assert_eq!(sender.call_count(), 6);
        assert_eq!(snapshots.last().unwrap().progress.total_planned, 6);
        assert_eq!(run.residual_targets(), vec![Target::new("t6@test.com")]);
    }

    #[tokio::test]
    async fn test_all_failures_still_complete() {
        let sender = Arc::new(MockSender::new_fail(ErrorKind::AuthFailed, "bad password"));
        let run = orchestrator(Arc::clone(&sender)).run(request(5, 2, DispatchMode::Partition, 10));
        let (snapshots, run) = drain(run).await;

        let last = snapshots.last().unwrap();
        assert_eq!(last.errors.total_errors, 5);
        assert_eq!(last.progress.total_sent, 0);
        assert!(last
            .progress
            .accounts
            .iter()
            .all(|a| a.status == AccountStatus::Completed));
        assert_eq!(last.summary_line, "Total: 5 errors across 2 accounts");
        assert_eq!(run.residual_targets().len(), 5);
    }

    #[tokio::test]
    async fn test_zero_accounts_yields_single_error_snapshot() {
        let sender = Arc::new(MockSender::new_success());
        let run = orchestrator(Arc::clone(&sender)).run(request(5, 0, DispatchMode::Partition, 10));
        let (snapshots, run) = drain(run).await;

        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].terminal);
        assert!(snapshots[0].log_line.starts_with("ERROR:"));
        assert_eq!(sender.call_count(), 0);
        assert_eq!(run.residual_targets().len(), 5);
    }

    #[tokio::test]
    async fn test_zero_targets_and_duplicates_are_rejected() {
        let sender = Arc::new(MockSender::new_success());
        let orch = orchestrator(Arc::clone(&sender));

        let (snapshots, _) = drain(orch.run(request(0, 2, DispatchMode::Partition, 10))).await;
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].log_line.starts_with("ERROR:"));

        let mut dup = accounts(2);
        dup.push(Account::new("a0@example.com", "other"));
        let req = DispatchRequest::new(targets(3), dup, DispatchMode::Partition, 10);
        let (snapshots, _) = drain(orch.run(req)).await;
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].log_line.contains("a0@example.com"));
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn test_accounts_truncated_to_max() {
        let sender = Arc::new(MockSender::new_success());
        let settings = DispatchSettings {
            max_accounts: 2,
            ..fast_settings()
        };
        let orch = Orchestrator::new(
            Arc::clone(&sender) as Arc<dyn Sender>,
            Arc::new(FixedTimeProvider(0)),
            settings,
        )
        .unwrap();
        let (snapshots, _) = drain(orch.run(request(6, 3, DispatchMode::Partition, 10))).await;

        let last = snapshots.last().unwrap();
        assert_eq!(last.progress.total_accounts, 2);
        assert_eq!(sender.call_count(), 6);
        assert!(sender.calls_for("a2@example.com").is_empty());
    }

    #[tokio::test]
    async fn test_panicking_sender_isolated_to_one_account() {
        let sender = Arc::new(
            MockSender::new_success()
                .with_account_behavior("a0@example.com", MockBehavior::Panic("boom".into())),
        );
        let run = orchestrator(Arc::clone(&sender)).run(request(6, 2, DispatchMode::Partition, 10));
        let (snapshots, _) = drain(run).await;

        let last = snapshots.last().unwrap();
        assert_eq!(last.progress.accounts[0].status, AccountStatus::Aborted);
        assert_eq!(last.progress.accounts[0].sent, 0);
        assert_eq!(last.progress.accounts[1].status, AccountStatus::Completed);
        assert_eq!(last.progress.accounts[1].sent, 3);
        assert_eq!(last.errors.total_errors, 1);
        assert_eq!(last.errors.accounts[0].recent[0].kind, ErrorKind::WorkerError);
        assert_eq!(sender.calls_for("a0@example.com").len(), 1);
    }

    #[tokio::test]
    async fn test_sum_of_sent_matches_success_messages() {
        let failing = vec![Target::new("t1@test.com"), Target::new("t4@test.com")];
        let sender = Arc::new(MockSender::new(MockBehavior::FailTargets(
            failing.clone(),
            ErrorKind::InvalidRecipient,
        )));
        let run = orchestrator(Arc::clone(&sender)).run(request(9, 3, DispatchMode::Partition, 10));
        let (snapshots, run) = drain(run).await;

        let last = snapshots.last().unwrap();
        assert_eq!(last.progress.total_sent, run.aggregator().successes_observed());
        assert_eq!(last.progress.total_sent, 7);
        assert_eq!(run.residual_targets(), failing);
    }

    #[tokio::test]
    async fn test_progress_snapshots_report_live_workers() {
        let sender = Arc::new(MockSender::new_success());
        let mut run = orchestrator(sender).run(request(2, 2, DispatchMode::Partition, 10));

        let first = run.next().await.unwrap();
        assert!(!first.terminal);
        assert!(first.log_line.starts_with("Processing... "));
        assert!(first.log_line.ends_with(" workers active"));

        let (rest, _) = drain(run).await;
        let before_last = &rest[rest.len() - 2];
        assert_eq!(before_last.log_line, "Processing... 0 workers active");
    }

    #[tokio::test]
    async fn test_target_store_used_in_partition_only() {
        let mut store = MockTargetStore::new();
        store.expect_remove().times(4).returning(|_| Ok(()));
        let orch =
            orchestrator(Arc::new(MockSender::new_success())).with_target_store(Arc::new(store));
        drain(orch.run(request(4, 2, DispatchMode::Partition, 10))).await;

        let mut store = MockTargetStore::new();
        store.expect_remove().times(0);
        let orch =
            orchestrator(Arc::new(MockSender::new_success())).with_target_store(Arc::new(store));
        drain(orch.run(request(4, 2, DispatchMode::Broadcast, 10))).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_workers() {
        let settings = DispatchSettings::default();
        let orch = Orchestrator::new(
            Arc::new(MockSender::new_success()),
            Arc::new(FixedTimeProvider(0)),
            settings,
        )
        .unwrap();
        let mut run = orch.run(request(10, 2, DispatchMode::Partition, 10));

        run.next().await.unwrap();
        run.shutdown_handle().shutdown();
        let (snapshots, run) = drain(run).await;

        let last = snapshots.last().unwrap();
        assert!(last.terminal);
        assert!(last
            .progress
            .accounts
            .iter()
            .all(|a| a.status == AccountStatus::Cancelled));
        assert!(last.progress.total_sent < 10);
        assert_eq!(last.progress.total_sent, run.aggregator().successes_observed());
        assert_eq!(
            run.residual_targets().len() as u64,
            10 - last.progress.total_sent
        );
    }

    #[tokio::test]
    async fn test_stream_ends_after_terminal() {
        let run = orchestrator(Arc::new(MockSender::new_success()))
            .run(request(3, 1, DispatchMode::Partition, 10));
        let snapshots: Vec<Snapshot> = run.into_stream().collect().await;
        assert_single_terminal(&snapshots);
    }

    #[tokio::test]
    async fn test_run_id_comes_from_provider() {
        struct FixedId;
        impl IdProvider for FixedId {
            fn generate_id(&self) -> String {
                "run-1".to_string()
            }
        }
        let orch =
            orchestrator(Arc::new(MockSender::new_success())).with_id_provider(Arc::new(FixedId));
        let run = orch.run(request(1, 1, DispatchMode::Partition, 1));
        assert_eq!(run.run_id(), "run-1");
    }
}
