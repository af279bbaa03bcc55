//! Relay CLI - bulk dispatch of outbound tasks across many sending accounts

mod logging;
mod settings;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use relay_core::application::{plan, DispatchSettings, Orchestrator, Snapshot};
use relay_core::domain::{Account, DispatchMode, DispatchRequest, Target};
use relay_core::port::time_provider::SystemTimeProvider;
use relay_infra_file::{
    load_accounts, load_targets, parse_account_lines, parse_target_lines, FileTargetStore,
};
use relay_infra_transport::{DryRunSender, ProviderRouter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::{info, warn};

use crate::logging::LogFormat;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay dispatch engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./relay.toml if present)
    #[arg(long, global = true, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Console log format
    #[arg(long, global = true, env = "RELAY_LOG_FORMAT", value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Also write JSON logs to a daily-rolling file in this directory
    #[arg(long, global = true, env = "RELAY_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Args)]
struct InputArgs {
    /// Accounts file, one `address,credential` per line
    #[arg(long)]
    accounts: PathBuf,

    /// Targets file, one address per line
    #[arg(long)]
    targets: PathBuf,
}

#[derive(Args)]
struct PlanArgs {
    #[command(flatten)]
    input: InputArgs,

    /// broadcast: every account gets every target; partition: split once
    #[arg(long, default_value = "partition")]
    mode: DispatchMode,

    /// Max targets per account (partition mode)
    #[arg(long, default_value = "100", allow_hyphen_values = true)]
    cap: i64,

    /// Use at most this many accounts (overrides config)
    #[arg(long)]
    max_accounts: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch targets and stream progress until done
    Run {
        #[command(flatten)]
        args: PlanArgs,

        /// Minimum spacing between sends of one account, in ms (overrides config)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Simulated latency of each dry-run send, in ms
        #[arg(long, default_value = "0")]
        dry_run_latency_ms: u64,

        /// Remove reached targets from the targets file (partition mode)
        #[arg(long)]
        remove_sent: bool,

        /// Write targets not reached to this file
        #[arg(long)]
        residual_out: Option<PathBuf>,

        /// Print every snapshot as one JSON line
        #[arg(long)]
        json: bool,
    },

    /// Show how targets would be distributed, without sending
    Plan(PlanArgs),

    /// Check account and target files
    Validate(InputArgs),
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Assigned")]
    assigned: usize,
    #[tabled(rename = "First")]
    first: String,
    #[tabled(rename = "Last")]
    last: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logging = logging::init(cli.log_format, cli.log_dir.as_deref())?;

    let config = settings::load(cli.config.as_deref())?;
    let router = ProviderRouter::default().extend(config.providers.clone());

    match cli.command {
        Commands::Run {
            args,
            delay_ms,
            dry_run_latency_ms,
            remove_sent,
            residual_out,
            json,
        } => {
            let mut dispatch = with_max_accounts(config.dispatch, args.max_accounts);
            if let Some(delay_ms) = delay_ms {
                dispatch.send_delay_ms = delay_ms;
            }
            let options = RunOptions {
                latency: Duration::from_millis(dry_run_latency_ms),
                remove_sent,
                residual_out,
                json,
            };
            run(args, dispatch, router, options).await?;
        }

        Commands::Plan(args) => {
            let dispatch = with_max_accounts(config.dispatch, args.max_accounts);
            show_plan(args, &dispatch, &router).await?;
        }

        Commands::Validate(input) => validate(&input, &router).await?,
    }

    Ok(())
}

struct RunOptions {
    latency: Duration,
    remove_sent: bool,
    residual_out: Option<PathBuf>,
    json: bool,
}

fn with_max_accounts(
    mut dispatch: DispatchSettings,
    max_accounts: Option<usize>,
) -> DispatchSettings {
    if let Some(max) = max_accounts {
        dispatch.max_accounts = max;
    }
    dispatch
}

async fn load_input(input: &InputArgs) -> Result<(Vec<Account>, Vec<Target>)> {
    let accounts = load_accounts(&input.accounts)
        .await
        .with_context(|| format!("failed to load accounts from {}", input.accounts.display()))?;
    let targets = load_targets(&input.targets)
        .await
        .with_context(|| format!("failed to load targets from {}", input.targets.display()))?;
    Ok((accounts, targets))
}

async fn run(
    args: PlanArgs,
    dispatch: DispatchSettings,
    router: ProviderRouter,
    options: RunOptions,
) -> Result<()> {
    let (accounts, targets) = load_input(&args.input).await?;

    let sender = DryRunSender::new(router).with_latency(options.latency);
    let mut orchestrator =
        Orchestrator::new(Arc::new(sender), Arc::new(SystemTimeProvider), dispatch)?;
    if options.remove_sent {
        if args.mode == DispatchMode::Broadcast {
            warn!("--remove-sent only applies in partition mode; targets file left untouched");
        }
        orchestrator =
            orchestrator.with_target_store(Arc::new(FileTargetStore::new(&args.input.targets)));
    }

    let mut run = orchestrator.run(DispatchRequest::new(targets, accounts, args.mode, args.cap));
    info!(run_id = %run.run_id(), mode = %args.mode, "Dispatch started");

    let shutdown = run.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping workers after their current send");
            shutdown.shutdown();
        }
    });

    // Residual list is read after the last snapshot, so poll by hand
    let mut last_sent = None;
    let mut final_snapshot = None;
    while let Some(snapshot) = run.next().await {
        if options.json {
            println!("{}", serde_json::to_string(&snapshot)?);
        } else {
            print_snapshot(&snapshot, &mut last_sent);
        }
        if snapshot.terminal {
            final_snapshot = Some(snapshot);
        }
    }

    if let Some(path) = &options.residual_out {
        write_residual(path, &run.residual_targets()).await?;
    }

    match final_snapshot {
        Some(snapshot) if snapshot.log_line.starts_with("ERROR:") => {
            anyhow::bail!("{}", snapshot.log_line.trim_start_matches("ERROR:").trim())
        }
        _ => Ok(()),
    }
}

fn print_snapshot(snapshot: &Snapshot, last_sent: &mut Option<u64>) {
    if snapshot.terminal {
        if snapshot.log_line.starts_with("ERROR:") {
            println!("{}", snapshot.log_line.red().bold());
            return;
        }
        println!();
        println!("{}", snapshot.progress);
        println!();
        println!("{}", snapshot.errors);
        println!();
        let summary = if snapshot.errors.total_errors == 0 {
            snapshot.summary_line.green()
        } else {
            snapshot.summary_line.yellow()
        };
        println!("{}", summary.bold());
        println!("{}", format!("✓ {}", snapshot.log_line).green().bold());
        return;
    }

    // Full progress block only when something was sent since the last one
    if *last_sent != Some(snapshot.progress.total_sent) {
        *last_sent = Some(snapshot.progress.total_sent);
        println!("{}", snapshot.progress);
    }
    println!("{}", snapshot.log_line.dimmed());
}

async fn write_residual(path: &Path, residual: &[Target]) -> Result<()> {
    let content: String = residual.iter().map(|t| format!("{}\n", t)).collect();
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("failed to write residual targets to {}", path.display()))?;
    println!(
        "{}",
        format!("{} residual targets written to {}", residual.len(), path.display()).cyan()
    );
    Ok(())
}

async fn show_plan(
    args: PlanArgs,
    dispatch: &DispatchSettings,
    router: &ProviderRouter,
) -> Result<()> {
    let (mut accounts, targets) = load_input(&args.input).await?;
    accounts.truncate(dispatch.max_accounts);

    let distribution = plan(&targets, &accounts, args.mode, args.cap);
    let rows: Vec<PlanRow> = distribution
        .queues
        .iter()
        .map(|queue| PlanRow {
            account: queue.account.id.to_string(),
            provider: router
                .resolve(&queue.account)
                .map(|p| format!("{}:{}", p.server, p.port))
                .unwrap_or_else(|| "unsupported".to_string()),
            assigned: queue.targets.len(),
            first: queue.targets.first().map(|t| t.to_string()).unwrap_or_default(),
            last: queue.targets.last().map(|t| t.to_string()).unwrap_or_default(),
        })
        .collect();

    println!(
        "{}",
        format!("Distribution ({} mode, cap {})", args.mode, args.cap).cyan().bold()
    );
    println!();
    println!("{}", Table::new(rows));
    println!();
    println!("  {} {}", "Dispatched:".bold(), distribution.total_dispatched());
    if distribution.unassigned.is_empty() {
        println!("  {} {}", "Unassigned:".bold(), 0);
    } else {
        println!(
            "  {} {}",
            "Unassigned:".bold(),
            distribution.unassigned.len().to_string().yellow()
        );
    }
    Ok(())
}

async fn validate(input: &InputArgs, router: &ProviderRouter) -> Result<()> {
    println!("{}", "File check".cyan().bold());
    println!();

    let mut ok = true;
    let accounts_text = tokio::fs::read_to_string(&input.accounts)
        .await
        .with_context(|| format!("failed to read {}", input.accounts.display()))?;
    match parse_account_lines(&accounts_text) {
        Ok(accounts) => {
            println!(
                "  {} {}",
                "Accounts:".bold(),
                format!("Valid: {} accounts", accounts.len()).green()
            );
            let unsupported = accounts.iter().filter(|a| !router.supports(a)).count();
            if unsupported > 0 {
                println!(
                    "  {} {}",
                    "Providers:".bold(),
                    format!("{} accounts have no known provider", unsupported).yellow()
                );
            }
        }
        Err(e) => {
            ok = false;
            println!("  {} {}", "Accounts:".bold(), e.to_string().red());
        }
    }

    let targets_text = tokio::fs::read_to_string(&input.targets)
        .await
        .with_context(|| format!("failed to read {}", input.targets.display()))?;
    match parse_target_lines(&targets_text) {
        Ok(targets) => println!(
            "  {} {}",
            "Targets:".bold(),
            format!("Valid: {} leads", targets.len()).green()
        ),
        Err(e) => {
            ok = false;
            println!("  {} {}", "Targets:".bold(), e.to_string().red());
        }
    }

    if !ok {
        anyhow::bail!("input files are not valid");
    }
    Ok(())
}
