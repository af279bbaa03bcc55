// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("No accounts provided")]
    NoAccounts,

    #[error("No targets provided")]
    NoTargets,

    #[error("Duplicate account: {0}")]
    DuplicateAccount(String),

    #[error("Unknown dispatch mode: {0}")]
    UnknownMode(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
