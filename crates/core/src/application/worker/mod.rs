// Worker - per-account send loop

pub mod constants;
mod panic_guard;
mod shutdown;

pub use panic_guard::{describe_join_error, panic_message};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::settings::DispatchSettings;
use crate::domain::{Account, AccountId, ErrorKind, QueueItem, ResultMessage, StopReason, Target};
use crate::port::{SendOutcome, Sender, TargetStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, info, warn};

/// Drains one account's task queue.
///
/// IDLE → RUNNING → (SENDING → SUCCESS | FAILURE)* → COMPLETED
///
/// Emits one [`ResultMessage`] per task and exactly one completion message,
/// whatever path ends the loop (including unwinding).
pub struct Worker {
    account: Account,
    sender: Arc<dyn Sender>,
    target_store: Option<Arc<dyn TargetStore>>,
    send_delay: Duration,
    queue_poll_timeout: Duration,
}

impl Worker {
    pub fn new(account: Account, sender: Arc<dyn Sender>, settings: &DispatchSettings) -> Self {
        Self {
            account,
            sender,
            target_store: None,
            send_delay: settings.send_delay(),
            queue_poll_timeout: settings.queue_poll_timeout(),
        }
    }

    /// Remove each reached target from `store` before moving on.
    /// The orchestrator only wires this in partition mode.
    pub fn with_target_store(mut self, store: Arc<dyn TargetStore>) -> Self {
        self.target_store = Some(store);
        self
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account.id
    }

    /// Run until the stop marker, a fault, or shutdown. Returns the sent count.
    pub async fn run(
        self,
        mut queue: UnboundedReceiver<QueueItem>,
        results: UnboundedSender<ResultMessage>,
        mut shutdown: ShutdownToken,
    ) -> u64 {
        info!(account = %self.account.id, "Worker started");
        let mut report = CompletionGuard::new(self.account.id.clone(), results);
        let mut next_start: Option<Instant> = None;

        loop {
            if shutdown.is_shutdown() || report.is_closed() {
                info!(account = %self.account.id, "Worker shutting down");
                report.stop(StopReason::Cancelled);
                break;
            }

            let target = match timeout(self.queue_poll_timeout, queue.recv()).await {
                Err(_) => {
                    debug!(account = %self.account.id, "Queue idle, polling again");
                    continue;
                }
                Ok(Some(QueueItem::Target(target))) => target,
                Ok(Some(QueueItem::Stop)) => {
                    report.stop(StopReason::Drained);
                    break;
                }
                Ok(None) => {
                    error!(account = %self.account.id, "Task queue closed before stop marker");
                    report.failure(
                        None,
                        ErrorKind::WorkerError,
                        "Worker error: task queue closed before stop marker".to_string(),
                    );
                    report.stop(StopReason::WorkerError);
                    break;
                }
            };

            // Cadence floor: measured from the previous task's start
            if let Some(at) = next_start {
                tokio::select! {
                    _ = sleep_until(at) => {},
                    _ = shutdown.wait() => {
                        info!(account = %self.account.id, "Worker interrupted during send delay");
                        report.stop(StopReason::Cancelled);
                        break;
                    }
                }
            }
            let started = Instant::now();
            next_start = Some(started + self.send_delay);

            match self.deliver(&target).await {
                Ok(SendOutcome::Sent { message }) => {
                    report.sent += 1;
                    self.mark_reached(&target).await;
                    debug!(
                        account = %self.account.id,
                        target = %target,
                        sent = report.sent,
                        "Send succeeded"
                    );
                    report.success(target, message);
                }
                Ok(SendOutcome::Failed { kind, message }) => {
                    warn!(
                        account = %self.account.id,
                        target = %target,
                        kind = %kind,
                        error = %message,
                        "Send failed"
                    );
                    report.failure(Some(target), kind, message);
                }
                Err(fault) => {
                    error!(account = %self.account.id, error = %fault, "Worker terminated early");
                    report.failure(
                        Some(target),
                        ErrorKind::WorkerError,
                        format!("Worker error: {}", fault),
                    );
                    report.stop(StopReason::WorkerError);
                    break;
                }
            }
        }

        let sent = report.sent;
        info!(account = %self.account.id, sent, reason = ?report.reason, "Worker stopped");
        drop(report);
        sent
    }

    /// Call the sender in its own task so a panicking adapter cannot take
    /// the worker's bookkeeping down with it
    async fn deliver(&self, target: &Target) -> Result<SendOutcome, String> {
        let sender = Arc::clone(&self.sender);
        let account = self.account.clone();
        let target = target.clone();

        let handle = tokio::task::spawn(async move { sender.send(&account, &target).await });
        handle.await.map_err(describe_join_error)
    }

    async fn mark_reached(&self, target: &Target) {
        if let Some(store) = &self.target_store {
            if let Err(e) = store.remove(target).await {
                warn!(
                    account = %self.account.id,
                    target = %target,
                    error = %e,
                    "Failed to remove reached target from store"
                );
            }
        }
    }
}

/// Owns the worker's side of the result channel and emits the single
/// completion message on drop.
struct CompletionGuard {
    account_id: AccountId,
    results: UnboundedSender<ResultMessage>,
    sent: u64,
    reason: StopReason,
}

impl CompletionGuard {
    fn new(account_id: AccountId, results: UnboundedSender<ResultMessage>) -> Self {
        Self {
            account_id,
            results,
            sent: 0,
            // Anything that skips `stop` is a fault
            reason: StopReason::WorkerError,
        }
    }

    fn is_closed(&self) -> bool {
        self.results.is_closed()
    }

    fn stop(&mut self, reason: StopReason) {
        self.reason = reason;
    }

    fn success(&self, target: Target, message: String) {
        self.emit(ResultMessage::success(
            self.account_id.clone(),
            target,
            message,
            self.sent,
        ));
    }

    fn failure(&self, target: Option<Target>, kind: ErrorKind, message: String) {
        self.emit(ResultMessage::failure(
            self.account_id.clone(),
            target,
            kind,
            message,
            self.sent,
        ));
    }

    fn emit(&self, message: ResultMessage) {
        if self.results.send(message).is_err() {
            debug!(account = %self.account_id, "Result channel closed, dropping message");
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.failure(
                None,
                ErrorKind::WorkerError,
                "Worker error: worker loop panicked".to_string(),
            );
            self.reason = StopReason::WorkerError;
        }
        self.emit(ResultMessage::completed(
            self.account_id.clone(),
            self.reason,
            self.sent,
        ));
    }
}
