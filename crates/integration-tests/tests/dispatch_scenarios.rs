//! End-to-end dispatch scenarios: orchestrator + dry-run transport.

use futures::StreamExt;
use relay_core::application::aggregator::AccountStatus;
use relay_core::application::{DispatchRun, DispatchSettings, Orchestrator, Snapshot};
use relay_core::domain::{Account, DispatchMode, DispatchRequest, ErrorKind, Target};
use relay_core::port::time_provider::SystemTimeProvider;
use relay_core::port::{FnSender, SendOutcome, Sender};
use relay_infra_transport::{DryRunSender, ProviderRouter};
use std::sync::Arc;

fn settings() -> DispatchSettings {
    DispatchSettings {
        send_delay_ms: 0,
        ..Default::default()
    }
}

fn orchestrator(sender: Arc<dyn Sender>) -> Orchestrator {
    Orchestrator::new(sender, Arc::new(SystemTimeProvider), settings()).unwrap()
}

fn dry_run() -> Arc<dyn Sender> {
    Arc::new(DryRunSender::new(ProviderRouter::default()))
}

fn gmail_accounts(n: usize) -> Vec<Account> {
    (0..n)
        .map(|i| Account::new(format!("sender{}@gmail.com", i), "app-password"))
        .collect()
}

fn leads(n: usize) -> Vec<Target> {
    (0..n)
        .map(|i| Target::new(format!("lead{}@corp.example", i)))
        .collect()
}

async fn last_snapshot(run: DispatchRun) -> Snapshot {
    let snapshots: Vec<Snapshot> = run.into_stream().collect().await;
    assert_eq!(snapshots.iter().filter(|s| s.terminal).count(), 1);
    snapshots.into_iter().last().unwrap()
}

#[tokio::test]
async fn test_partition_five_targets_two_accounts() {
    let run = orchestrator(dry_run()).run(DispatchRequest::new(
        leads(5),
        gmail_accounts(2),
        DispatchMode::Partition,
        10,
    ));
    let last = last_snapshot(run).await;

    assert_eq!(last.log_line, "All tasks complete");
    let per_account: Vec<(u64, u64)> = last
        .progress
        .accounts
        .iter()
        .map(|a| (a.sent, a.total))
        .collect();
    assert_eq!(per_account, vec![(3, 3), (2, 2)]);
    assert_eq!(last.summary_line, "No errors");
}

#[tokio::test]
async fn test_broadcast_five_targets_two_accounts() {
    let run = orchestrator(dry_run()).run(DispatchRequest::new(
        leads(5),
        gmail_accounts(2),
        DispatchMode::Broadcast,
        1,
    ));
    let last = last_snapshot(run).await;

    assert_eq!(last.progress.total_sent, 10);
    assert!(last.progress.accounts.iter().all(|a| a.sent == 5 && a.total == 5));
}

#[tokio::test]
async fn test_cap_truncation_is_reported_as_residual() {
    let mut run = orchestrator(dry_run()).run(DispatchRequest::new(
        leads(7),
        gmail_accounts(3),
        DispatchMode::Partition,
        2,
    ));
    let mut last = None;
    while let Some(snapshot) = run.next().await {
        last = Some(snapshot);
    }
    let last = last.unwrap();

    assert_eq!(last.progress.total_sent, 6);
    assert_eq!(last.progress.total_planned, 6);
    assert_eq!(run.residual_targets(), vec![Target::new("lead6@corp.example")]);
}

#[tokio::test]
async fn test_all_sends_fail_with_auth_error() {
    let sender: Arc<dyn Sender> = Arc::new(FnSender::new(|account: &Account, _target: &Target| {
        SendOutcome::from_parts(
            false,
            Some("AUTH_FAILED"),
            format!("Authentication failed for {}", account.id),
        )
    }));
    let run = orchestrator(sender).run(DispatchRequest::new(
        leads(5),
        gmail_accounts(2),
        DispatchMode::Partition,
        10,
    ));
    let last = last_snapshot(run).await;

    assert_eq!(last.errors.total_errors, 5);
    assert_eq!(last.progress.total_sent, 0);
    assert!(last
        .progress
        .accounts
        .iter()
        .all(|a| a.status == AccountStatus::Completed));
    for account in &last.errors.accounts {
        assert!(account
            .recent
            .iter()
            .all(|e| e.kind == ErrorKind::AuthFailed));
    }
    assert!(last.errors.to_string().contains("Authentication Failed"));
}

#[tokio::test]
async fn test_zero_accounts_spawns_nothing() {
    let run = orchestrator(dry_run()).run(DispatchRequest::new(
        leads(5),
        Vec::new(),
        DispatchMode::Partition,
        10,
    ));
    let snapshots: Vec<Snapshot> = run.into_stream().collect().await;

    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].terminal);
    assert!(snapshots[0].log_line.starts_with("ERROR:"));
    assert!(snapshots[0].progress.accounts.is_empty());
}

#[tokio::test]
async fn test_unsupported_provider_fails_every_task_of_that_account() {
    let mut accounts = gmail_accounts(1);
    accounts.push(Account::new("ops@corp.example", "pw"));
    let run = orchestrator(dry_run()).run(DispatchRequest::new(
        leads(6),
        accounts,
        DispatchMode::Partition,
        10,
    ));
    let last = last_snapshot(run).await;

    assert_eq!(last.progress.accounts[0].sent, 3);
    assert_eq!(last.progress.accounts[1].sent, 0);
    assert_eq!(last.errors.accounts.len(), 1);
    assert_eq!(last.errors.accounts[0].error_count, 3);
    assert_eq!(
        last.errors.accounts[0].recent[0].kind,
        ErrorKind::UnsupportedProvider
    );
    assert_eq!(last.summary_line, "Total: 3 errors across 1 accounts");
}

#[tokio::test]
async fn test_residual_targets_feed_a_second_run() {
    let mut targets = leads(4);
    targets.push(Target::new("broken@"));
    let orch = orchestrator(dry_run());

    let mut first = orch.run(DispatchRequest::new(
        targets,
        gmail_accounts(2),
        DispatchMode::Partition,
        10,
    ));
    while first.next().await.is_some() {}
    let residual = first.residual_targets();
    assert_eq!(residual, vec![Target::new("broken@")]);

    let second = orch.run(DispatchRequest::new(
        residual,
        gmail_accounts(2),
        DispatchMode::Partition,
        2,
    ));
    let last = last_snapshot(second).await;
    assert_eq!(last.errors.accounts[0].recent[0].kind, ErrorKind::InvalidRecipient);
}

#[tokio::test]
async fn test_snapshots_serialize_to_json() {
    let run = orchestrator(dry_run()).run(DispatchRequest::new(
        leads(2),
        gmail_accounts(1),
        DispatchMode::Partition,
        10,
    ));
    let last = last_snapshot(run).await;

    let value = serde_json::to_value(&last).unwrap();
    assert_eq!(value["terminal"], true);
    assert_eq!(value["progress"]["total_sent"], 2);
    assert_eq!(value["progress"]["accounts"][0]["status"], "completed");
    assert_eq!(value["summary_line"], "No errors");
}
