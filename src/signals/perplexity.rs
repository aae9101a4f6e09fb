//! Language-model perplexity of a document.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::models::{BatchSize, DataType, Document, ExecutionConfig, Field, Item, Parallelism};
use crate::domain::ports::{
    select_device, DeviceProbe, Lifecycle, LoadedModel, ModelRuntime, Signal, SignalCapability,
    SignalState,
};

pub const PERPLEXITY_SIGNAL: &str = "perplexity";

/// Texts handed to the model per call
pub const PERPLEXITY_SUB_BATCH: usize = 256;

fn default_model_id() -> String {
    "gpt2".to_string()
}

/// Options for [`PerplexitySignal`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerplexityOptions {
    /// Scoring language model
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

impl Default for PerplexityOptions {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
        }
    }
}

/// Scores each text with the perplexity of a language model.
///
/// The executor passes the input through unchunked; the signal feeds the
/// model fixed sub-batches of [`PERPLEXITY_SUB_BATCH`] texts. Offloading uses
/// the `perplexity` operation.
pub struct PerplexitySignal {
    options: PerplexityOptions,
    runtime: Arc<dyn ModelRuntime>,
    probe: Arc<dyn DeviceProbe>,
    model: Option<Box<dyn LoadedModel>>,
    lifecycle: Lifecycle,
}

impl PerplexitySignal {
    pub fn new(
        options: PerplexityOptions,
        runtime: Arc<dyn ModelRuntime>,
        probe: Arc<dyn DeviceProbe>,
    ) -> Self {
        Self {
            options,
            runtime,
            probe,
            model: None,
            lifecycle: Lifecycle::new(),
        }
    }
}

#[async_trait]
impl Signal for PerplexitySignal {
    fn name(&self) -> &str {
        PERPLEXITY_SIGNAL
    }

    fn fields(&self) -> Field {
        Field::Primitive(DataType::Float32)
    }

    fn capability(&self) -> SignalCapability {
        SignalCapability::Remote {
            operation: PERPLEXITY_SIGNAL.to_string(),
        }
    }

    fn execution(&self) -> ExecutionConfig {
        ExecutionConfig::new(BatchSize::Unchunked, Parallelism::Sequential).exclusive()
    }

    fn remote_options(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("model_id".to_string(), self.options.model_id.clone())])
    }

    fn state(&self) -> SignalState {
        self.lifecycle.state()
    }

    fn setup(&mut self) -> Result<()> {
        let device = select_device(self.probe.as_ref());
        let model = self
            .runtime
            .load(&self.options.model_id, device)
            .with_context(|| format!("Failed to load model '{}'", self.options.model_id))?;
        info!(model_id = %self.options.model_id, %device, "Language model loaded");
        self.model = Some(model);
        self.lifecycle.mark_ready();
        Ok(())
    }

    fn teardown(&mut self) {
        self.model = None;
        if self.lifecycle.release() {
            debug!(model_id = %self.options.model_id, "Language model released");
        }
    }

    async fn compute(&self, batch: &[Document]) -> Result<Vec<Item>> {
        let model = self
            .model
            .as_deref()
            .ok_or_else(|| anyhow!("signal '{}' is not set up", self.name()))?;

        let mut items = vec![Item::Null; batch.len()];
        let texts: Vec<(usize, &str)> = batch
            .iter()
            .enumerate()
            .filter_map(|(index, document)| document.as_text().map(|text| (index, text)))
            .collect();

        for chunk in texts.chunks(PERPLEXITY_SUB_BATCH) {
            let inputs: Vec<&str> = chunk.iter().map(|(_, text)| *text).collect();
            let scores = model.run(&inputs)?;
            if scores.len() != inputs.len() {
                anyhow::bail!(
                    "model returned {} scores for {} texts",
                    scores.len(),
                    inputs.len()
                );
            }
            for ((index, _), output) in chunk.iter().zip(scores) {
                let score = output
                    .first()
                    .copied()
                    .ok_or_else(|| anyhow!("model returned an empty score"))?;
                items[*index] = Item::from(Value::from(f64::from(score)));
            }
        }
        Ok(items)
    }
}
