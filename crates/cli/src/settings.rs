//! Layered configuration: defaults, then `relay.toml` (or `--config`),
//! then `RELAY_*` environment variables. Command-line flags are applied
//! on top by the caller.
//!
//! ```toml
//! [dispatch]
//! send_delay_ms = 4500
//! max_accounts = 20
//!
//! [providers."corp.example"]
//! server = "mx.corp.example"
//! port = 2525
//! ```
//!
//! Environment keys use `__` between sections: `RELAY_DISPATCH__SEND_DELAY_MS=0`.

use anyhow::Context;
use config::{Config, Environment, File};
use relay_core::application::DispatchSettings;
use relay_infra_transport::ProviderConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_CONFIG_NAME: &str = "relay";
const ENV_PREFIX: &str = "RELAY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub dispatch: DispatchSettings,
    /// Extra or overriding provider endpoints, keyed by account domain
    pub providers: HashMap<String, ProviderConfig>,
}

pub fn load(path: Option<&Path>) -> anyhow::Result<RelayConfig> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let config: RelayConfig = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read configuration")?
        .try_deserialize()
        .context("invalid configuration")?;

    config.dispatch.validate()?;
    Ok(config)
}
