// Account Domain Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address-like identifier of a sending account (e.g. `ops@example.com`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque credential handle.
///
/// The core never interprets it; only the Sender adapter does. `Debug`
/// output is redacted so credentials cannot leak through logs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CredentialHandle(String);

impl CredentialHandle {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHandle(***)")
    }
}

/// A sending identity. Built once per run from validated input, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub credential: CredentialHandle,
}

impl Account {
    pub fn new(id: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(id),
            credential: CredentialHandle::new(credential),
        }
    }

    /// Lowercased part after the last `@`, if any
    pub fn domain(&self) -> Option<String> {
        self.id
            .as_str()
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
    }
}
