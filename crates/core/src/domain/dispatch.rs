// Dispatch Request Domain Model

use super::account::Account;
use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single recipient identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the global target list is spread over accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Every account sends to every target; the cap is ignored
    Broadcast,
    /// Targets are split once across accounts, capped per account
    Partition,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Broadcast => write!(f, "broadcast"),
            DispatchMode::Partition => write!(f, "partition"),
        }
    }
}

impl FromStr for DispatchMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "broadcast" => Ok(DispatchMode::Broadcast),
            "partition" => Ok(DispatchMode::Partition),
            other => Err(DomainError::UnknownMode(other.to_string())),
        }
    }
}

/// Input of one orchestrated run
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub targets: Vec<Target>,
    pub accounts: Vec<Account>,
    pub mode: DispatchMode,
    /// Max targets per account in partition mode; `<= 0` assigns nothing
    pub cap: i64,
}

impl DispatchRequest {
    pub fn new(
        targets: Vec<Target>,
        accounts: Vec<Account>,
        mode: DispatchMode,
        cap: i64,
    ) -> Self {
        Self {
            targets,
            accounts,
            mode,
            cap,
        }
    }
}
