// Provider routing: account domain -> outbound relay endpoint

use relay_core::domain::Account;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outbound endpoint of one mail provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub server: String,
    pub port: u16,
}

impl ProviderConfig {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
        }
    }
}

/// Maps an account's domain to its provider endpoint
#[derive(Debug, Clone)]
pub struct ProviderRouter {
    providers: HashMap<String, ProviderConfig>,
}

impl Default for ProviderRouter {
    /// Built-in table of the common consumer providers (STARTTLS on 587)
    fn default() -> Self {
        let providers = [
            ("gmail.com", "smtp.gmail.com"),
            ("yahoo.com", "smtp.mail.yahoo.com"),
            ("hotmail.com", "smtp-mail.outlook.com"),
            ("outlook.com", "smtp-mail.outlook.com"),
            ("aol.com", "smtp.aol.com"),
        ]
        .into_iter()
        .map(|(domain, server)| (domain.to_string(), ProviderConfig::new(server, 587)))
        .collect();
        Self { providers }
    }
}

impl ProviderRouter {
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Add or replace a provider; the domain is matched case-insensitively
    pub fn with_provider(mut self, domain: &str, config: ProviderConfig) -> Self {
        self.providers.insert(domain.to_ascii_lowercase(), config);
        self
    }

    pub fn extend(mut self, extra: HashMap<String, ProviderConfig>) -> Self {
        for (domain, config) in extra {
            self.providers.insert(domain.to_ascii_lowercase(), config);
        }
        self
    }

    pub fn resolve(&self, account: &Account) -> Option<&ProviderConfig> {
        account
            .domain()
            .and_then(|domain| self.providers.get(&domain))
    }

    pub fn supports(&self, account: &Account) -> bool {
        self.resolve(account).is_some()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
