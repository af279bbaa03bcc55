// Domain Layer - Pure dispatch entities

pub mod account;
pub mod dispatch;
pub mod error;
pub mod error_kind;
pub mod message;
pub mod queue;

// Re-exports
pub use account::{Account, AccountId, CredentialHandle};
pub use dispatch::{DispatchMode, DispatchRequest, Target};
pub use error::DomainError;
pub use error_kind::ErrorKind;
pub use message::{Outcome, ResultMessage, StopReason};
pub use queue::QueueItem;
