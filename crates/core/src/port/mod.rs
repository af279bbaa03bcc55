// Port Layer - Interfaces for external collaborators

pub mod id_provider; // For deterministic testing
pub mod sender;
pub mod target_store;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use sender::{FnSender, SendOutcome, Sender};
pub use target_store::TargetStore;
pub use time_provider::TimeProvider;
