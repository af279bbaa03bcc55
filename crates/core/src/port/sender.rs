// Sender Port
// Abstraction for delivering one task for one account (SMTP, HTTP API, dry run...)

use crate::domain::{Account, ErrorKind, Target};
use async_trait::async_trait;

/// Tagged result of delivering a single task.
///
/// Adapters convert their transport errors into this at the boundary, so the
/// worker never handles transport-specific error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { message: String },
    Failed { kind: ErrorKind, message: String },
}

impl SendOutcome {
    pub fn sent(message: impl Into<String>) -> Self {
        SendOutcome::Sent {
            message: message.into(),
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        SendOutcome::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Build from the loose `(success, error_code, message)` triple some
    /// collaborators return
    pub fn from_parts(success: bool, error_code: Option<&str>, message: impl Into<String>) -> Self {
        if success {
            Self::sent(message)
        } else {
            let kind = error_code.map(ErrorKind::from_code).unwrap_or(ErrorKind::Other);
            Self::failed(kind, message)
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent { .. })
    }
}

/// Sender trait
///
/// Implementations:
/// - DryRunSender (relay-infra-transport): provider routing + simulated delivery
/// - FnSender: wraps a plain per-task closure
#[async_trait]
pub trait Sender: Send + Sync {
    /// Deliver one task. Must not panic on ordinary delivery errors; return
    /// `SendOutcome::Failed` instead.
    async fn send(&self, account: &Account, target: &Target) -> SendOutcome;
}

/// Adapts a synchronous per-task callable into a [`Sender`]
pub struct FnSender<F> {
    f: F,
}

impl<F> FnSender<F>
where
    F: Fn(&Account, &Target) -> SendOutcome + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Sender for FnSender<F>
where
    F: Fn(&Account, &Target) -> SendOutcome + Send + Sync,
{
    async fn send(&self, account: &Account, target: &Target) -> SendOutcome {
        (self.f)(account, target)
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::AccountId;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock sender behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with kind and message
        Fail(ErrorKind, String),
        /// Panic with message (for worker isolation testing)
        Panic(String),
        /// Fail only for the listed targets, succeed otherwise
        FailTargets(Vec<Target>, ErrorKind),
    }

    /// Mock Sender for testing
    ///
    /// Records every call in order; behavior can be overridden per account.
    pub struct MockSender {
        default_behavior: MockBehavior,
        account_behavior: HashMap<AccountId, MockBehavior>,
        latency: Option<Duration>,
        calls: Arc<Mutex<Vec<(AccountId, Target)>>>,
    }

    impl MockSender {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                default_behavior: behavior,
                account_behavior: HashMap::new(),
                latency: None,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }
        pub fn new_fail(kind: ErrorKind, message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(kind, message.into()))
        }
        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }
        /// Override behavior for one account
        pub fn with_account_behavior(mut self, account: &str, behavior: MockBehavior) -> Self {
            self.account_behavior
                .insert(AccountId::new(account), behavior);
            self
        }
        /// Simulated time spent inside each send
        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = Some(latency);
            self
        }
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
        pub fn calls(&self) -> Vec<(AccountId, Target)> {
            self.calls.lock().unwrap().clone()
        }
        pub fn calls_for(&self, account: &str) -> Vec<Target> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| id.as_str() == account)
                .map(|(_, target)| target.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Sender for MockSender {
        async fn send(&self, account: &Account, target: &Target) -> SendOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((account.id.clone(), target.clone()));

            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }

            let behavior = self
                .account_behavior
                .get(&account.id)
                .unwrap_or(&self.default_behavior)
                .clone();

            match behavior {
                MockBehavior::Success => {
                    SendOutcome::sent(format!("Email sent from {} to {}", account.id, target))
                }
                MockBehavior::Fail(kind, msg) => SendOutcome::failed(kind, msg),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg);
                }
                MockBehavior::FailTargets(targets, kind) => {
                    if targets.contains(target) {
                        SendOutcome::failed(kind, format!("Rejected: {}", target))
                    } else {
                        SendOutcome::sent(format!("Email sent from {} to {}", account.id, target))
                    }
                }
            }
        }
    }
}
