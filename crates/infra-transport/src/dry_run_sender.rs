// Dry-run Sender
// Routes every task the way a live transport would, then simulates delivery.

use crate::provider::ProviderRouter;
use async_trait::async_trait;
use relay_core::domain::{Account, ErrorKind, Target};
use relay_core::port::{SendOutcome, Sender};
use std::time::Duration;
use tracing::{debug, info};

/// Sender that never opens a connection.
///
/// Classification still happens for real:
/// - account domain without a provider -> `UNSUPPORTED_PROVIDER`
/// - malformed recipient address -> `INVALID_RECIPIENT`
pub struct DryRunSender {
    router: ProviderRouter,
    latency: Duration,
}

impl DryRunSender {
    pub fn new(router: ProviderRouter) -> Self {
        Self {
            router,
            latency: Duration::ZERO,
        }
    }

    /// Simulated time spent inside each send
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }
}

fn is_deliverable(target: &Target) -> bool {
    match target.as_str().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
        }
        None => false,
    }
}

#[async_trait]
impl Sender for DryRunSender {
    async fn send(&self, account: &Account, target: &Target) -> SendOutcome {
        let provider = match self.router.resolve(account) {
            Some(provider) => provider,
            None => {
                let domain = account.domain().unwrap_or_default();
                return SendOutcome::failed(
                    ErrorKind::UnsupportedProvider,
                    format!("Unsupported email provider: {}", domain),
                );
            }
        };

        if !is_deliverable(target) {
            return SendOutcome::failed(
                ErrorKind::InvalidRecipient,
                format!("Invalid recipient: {}", target),
            );
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        debug!(
            account = %account.id,
            target = %target,
            server = %provider.server,
            port = provider.port,
            "Dry-run delivery"
        );
        info!(account = %account.id, target = %target, "Email sent (dry run)");
        SendOutcome::sent(format!("Email sent from {} to {}", account.id, target))
    }
}
