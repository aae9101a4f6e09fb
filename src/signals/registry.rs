use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::binary_classification::{
    BinaryClassificationOptions, BinaryClassificationSignal, BINARY_CLASSIFICATION_SIGNAL,
};
use super::perplexity::{PerplexityOptions, PerplexitySignal, PERPLEXITY_SIGNAL};
use super::pii::{pii, PII_SIGNAL};
use crate::domain::ports::{DeviceProbe, ModelRuntime, Signal};
use crate::infrastructure::device_probe::ConfiguredDeviceProbe;
use crate::infrastructure::runtime::UnavailableRuntime;

/// Errors building a signal by name
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown signal '{name}'. Available: {available}")]
    UnknownSignal { name: String, available: String },

    #[error("Invalid options for signal '{signal}': {source}")]
    InvalidOptions {
        signal: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoOptions {}

/// Builds signals from a name and JSON options.
///
/// Each call returns a fresh instance; nothing is shared between instances
/// except the runtime and device probe handles.
#[derive(Clone)]
pub struct SignalRegistry {
    runtime: Arc<dyn ModelRuntime>,
    probe: Arc<dyn DeviceProbe>,
}

impl SignalRegistry {
    pub const NAMES: [&'static str; 3] = [
        PII_SIGNAL,
        BINARY_CLASSIFICATION_SIGNAL,
        PERPLEXITY_SIGNAL,
    ];

    pub fn new(runtime: Arc<dyn ModelRuntime>, probe: Arc<dyn DeviceProbe>) -> Self {
        Self { runtime, probe }
    }

    pub fn names(&self) -> &'static [&'static str] {
        &Self::NAMES
    }

    /// Build the signal `name`. `options` may be null for signals without
    /// required options.
    pub fn build(&self, name: &str, options: &Value) -> Result<Box<dyn Signal>, RegistryError> {
        match name {
            PII_SIGNAL => {
                parse_options::<NoOptions>(name, options)?;
                Ok(Box::new(pii()))
            }
            BINARY_CLASSIFICATION_SIGNAL => {
                let options: BinaryClassificationOptions = parse_options(name, options)?;
                Ok(Box::new(BinaryClassificationSignal::new(
                    options,
                    Arc::clone(&self.runtime),
                    Arc::clone(&self.probe),
                )))
            }
            PERPLEXITY_SIGNAL => {
                let options: PerplexityOptions = parse_options(name, options)?;
                Ok(Box::new(PerplexitySignal::new(
                    options,
                    Arc::clone(&self.runtime),
                    Arc::clone(&self.probe),
                )))
            }
            _ => Err(RegistryError::UnknownSignal {
                name: name.to_string(),
                available: Self::NAMES.join(", "),
            }),
        }
    }
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new(
            Arc::new(UnavailableRuntime),
            Arc::new(ConfiguredDeviceProbe::default()),
        )
    }
}

fn parse_options<T: DeserializeOwned>(signal: &str, options: &Value) -> Result<T, RegistryError> {
    let options = if options.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        options.clone()
    };
    serde_json::from_value(options).map_err(|source| RegistryError::InvalidOptions {
        signal: signal.to_string(),
        source,
    })
}
