//! File-backed inputs and the leads-file target store, driven through a full run.

use relay_core::application::{DispatchRun, DispatchSettings, Orchestrator};
use relay_core::domain::{DispatchMode, DispatchRequest};
use relay_core::port::time_provider::SystemTimeProvider;
use relay_infra_file::{load_accounts, load_targets, FileTargetStore};
use relay_infra_transport::{DryRunSender, ProviderRouter};
use std::path::Path;
use std::sync::Arc;

const ACCOUNTS: &str = "alpha@gmail.com,pw-one\n\nbeta@yahoo.com, pw,with,commas\n";
const LEADS: &str = "a@corp.example\nb@corp.example\nbad@\nc@corp.example\nd@corp.example\n";

fn orchestrator(leads_path: &Path) -> Orchestrator {
    Orchestrator::new(
        Arc::new(DryRunSender::new(ProviderRouter::default())),
        Arc::new(SystemTimeProvider),
        DispatchSettings {
            send_delay_ms: 0,
            ..Default::default()
        },
    )
    .unwrap()
    .with_target_store(Arc::new(FileTargetStore::new(leads_path)))
}

async fn drive(mut run: DispatchRun) -> DispatchRun {
    while run.next().await.is_some() {}
    run
}

#[tokio::test]
async fn test_partition_run_removes_reached_leads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let accounts_path = dir.path().join("accounts.txt");
    let leads_path = dir.path().join("leads.txt");
    tokio::fs::write(&accounts_path, ACCOUNTS).await.unwrap();
    tokio::fs::write(&leads_path, LEADS).await.unwrap();

    let accounts = load_accounts(&accounts_path).await.unwrap();
    let targets = load_targets(&leads_path).await.unwrap();
    assert_eq!(accounts[1].credential.expose(), "pw,with,commas");
    assert_eq!(targets.len(), 5);

    let run = orchestrator(&leads_path).run(DispatchRequest::new(
        targets,
        accounts,
        DispatchMode::Partition,
        10,
    ));
    let run = drive(run).await;

    // Only the undeliverable lead is left behind
    let remaining = tokio::fs::read_to_string(&leads_path).await.unwrap();
    assert_eq!(remaining, "bad@\n");
    let residual: Vec<String> = run.residual_targets().iter().map(|t| t.to_string()).collect();
    assert_eq!(residual, vec!["bad@"]);
}

#[tokio::test]
async fn test_broadcast_run_leaves_leads_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let accounts_path = dir.path().join("accounts.txt");
    let leads_path = dir.path().join("leads.txt");
    tokio::fs::write(&accounts_path, ACCOUNTS).await.unwrap();
    tokio::fs::write(&leads_path, LEADS).await.unwrap();

    let accounts = load_accounts(&accounts_path).await.unwrap();
    let targets = load_targets(&leads_path).await.unwrap();
    let run = orchestrator(&leads_path).run(DispatchRequest::new(
        targets,
        accounts,
        DispatchMode::Broadcast,
        10,
    ));
    drive(run).await;

    assert_eq!(tokio::fs::read_to_string(&leads_path).await.unwrap(), LEADS);
}

#[tokio::test]
async fn test_malformed_accounts_file_is_rejected_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let accounts_path = dir.path().join("accounts.txt");
    tokio::fs::write(&accounts_path, "alpha@gmail.com,pw\nbeta-no-comma\n")
        .await
        .unwrap();

    let err = load_accounts(&accounts_path).await.unwrap_err();
    assert!(err.to_string().contains("Line 2"));
}
