//! Command implementations.

pub mod endpoints;
pub mod run;
pub mod schema;

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

use crate::domain::models::Config;
use crate::infrastructure::credentials::ApiKeyResolver;
use crate::infrastructure::device_probe::ConfiguredDeviceProbe;
use crate::infrastructure::remote::RemoteClient;
use crate::infrastructure::runtime::UnavailableRuntime;
use crate::signals::SignalRegistry;

/// Build a remote client, resolving the API key from the configured
/// environment variable
pub fn remote_client(config: &Config) -> Result<RemoteClient> {
    let api_key = ApiKeyResolver::new(&config.remote.api_key_env)
        .resolve()
        .context("Remote execution needs an API key")?;
    RemoteClient::from_config(&config.remote, api_key).context("Failed to build remote client")
}

/// Signal registry wired to this host's devices
pub fn registry(config: &Config) -> SignalRegistry {
    SignalRegistry::new(
        Arc::new(UnavailableRuntime),
        Arc::new(ConfiguredDeviceProbe::from_config(&config.local)),
    )
}

/// Parse `--options` as a JSON object, null when absent
pub fn parse_options(raw: Option<&str>) -> Result<Value> {
    raw.map_or(Ok(Value::Null), |raw| {
        serde_json::from_str(raw).with_context(|| format!("Invalid --options JSON: {raw}"))
    })
}
