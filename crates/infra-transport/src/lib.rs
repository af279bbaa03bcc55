// Relay Infrastructure - Transport Adapters
// Implements: Sender

pub mod dry_run_sender;
pub mod provider;

pub use dry_run_sender::DryRunSender;
pub use provider::{ProviderConfig, ProviderRouter};
