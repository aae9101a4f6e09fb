//! Two-label text classification with a model loaded per signal instance.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::models::{
    BatchSize, DataType, Document, ExecutionConfig, Field, Item, Parallelism,
};
use crate::domain::ports::{
    select_device, DeviceProbe, LoadedModel, Lifecycle, ModelRuntime, Signal, SignalState,
};

pub const BINARY_CLASSIFICATION_SIGNAL: &str = "binary_classification";

const fn default_batch_size() -> usize {
    64
}

/// Options for [`BinaryClassificationSignal`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinaryClassificationOptions {
    /// Model hub identifier
    pub model_id: String,

    /// Texts per forward pass. Higher values use more device memory.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Scores each text with the softmax of a two-logit classifier.
///
/// The model is bound to one device for the instance's lifetime and is never
/// run concurrently.
pub struct BinaryClassificationSignal {
    options: BinaryClassificationOptions,
    runtime: Arc<dyn ModelRuntime>,
    probe: Arc<dyn DeviceProbe>,
    model: Option<Box<dyn LoadedModel>>,
    lifecycle: Lifecycle,
}

impl BinaryClassificationSignal {
    pub fn new(
        options: BinaryClassificationOptions,
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

    pub const fn options(&self) -> &BinaryClassificationOptions {
        &self.options
    }

    fn classify(model: &dyn LoadedModel, texts: &[&str]) -> Result<Vec<Item>> {
        let logits = model.run(texts)?;
        if logits.len() != texts.len() {
            anyhow::bail!(
                "model returned {} outputs for {} texts",
                logits.len(),
                texts.len()
            );
        }
        logits
            .iter()
            .map(|row| match softmax(row).as_slice() {
                [label_0, label_1, ..] => Ok(Item::Json(json!({
                    "label_0": label_0,
                    "label_1": label_1,
                }))),
                _ => Err(anyhow!("expected two logits, got {}", row.len())),
            })
            .collect()
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[async_trait]
impl Signal for BinaryClassificationSignal {
    fn name(&self) -> &str {
        BINARY_CLASSIFICATION_SIGNAL
    }

    fn fields(&self) -> Field {
        Field::map([
            ("label_0", Field::Primitive(DataType::Float32)),
            ("label_1", Field::Primitive(DataType::Float32)),
        ])
    }

    fn execution(&self) -> ExecutionConfig {
        ExecutionConfig::new(
            BatchSize::fixed(self.options.batch_size),
            Parallelism::Sequential,
        )
        .exclusive()
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
        info!(model_id = %self.options.model_id, %device, "Classifier loaded");
        self.model = Some(model);
        self.lifecycle.mark_ready();
        Ok(())
    }

    fn teardown(&mut self) {
        self.model = None;
        if self.lifecycle.release() {
            debug!(model_id = %self.options.model_id, "Classifier released");
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

        for chunk in texts.chunks(self.options.batch_size.max(1)) {
            let inputs: Vec<&str> = chunk.iter().map(|(_, text)| *text).collect();
            let scored = Self::classify(model, &inputs)?;
            for ((index, _), item) in chunk.iter().zip(scored) {
                items[*index] = item;
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DeviceKind;
    use crate::infrastructure::device_probe::ConfiguredDeviceProbe;
    use std::sync::Mutex;

    struct LengthModel {
        device: DeviceKind,
        calls: Arc<Mutex<Vec<usize>>>,
    }

    impl LoadedModel for LengthModel {
        fn run(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(batch.len());
            Ok(batch.iter().map(|t| vec![0.0, t.len() as f32]).collect())
        }

        fn device(&self) -> DeviceKind {
            self.device
        }
    }

    #[derive(Default)]
    struct Runtime {
        calls: Arc<Mutex<Vec<usize>>>,
        loaded_on: Mutex<Option<DeviceKind>>,
    }

    impl ModelRuntime for Runtime {
        fn load(&self, _model_id: &str, device: DeviceKind) -> Result<Box<dyn LoadedModel>> {
            *self.loaded_on.lock().unwrap() = Some(device);
            Ok(Box::new(LengthModel {
                device,
                calls: Arc::clone(&self.calls),
            }))
        }
    }

    fn signal(runtime: Arc<Runtime>, batch_size: usize) -> BinaryClassificationSignal {
        BinaryClassificationSignal::new(
            BinaryClassificationOptions {
                model_id: "org/classifier".to_string(),
                batch_size,
            },
            runtime,
            Arc::new(ConfiguredDeviceProbe::new(vec![DeviceKind::Cuda])),
        )
    }

    #[test]
    fn test_softmax() {
        let probs = softmax(&[0.0, 0.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        let probs = softmax(&[1000.0, 0.0]);
        assert!((probs[0] - 1.0).abs() < 1e-6);
        assert!(probs[1] >= 0.0);
    }

    #[test]
    fn test_options_defaults() {
        let options: BinaryClassificationOptions =
            serde_json::from_value(json!({"model_id": "org/classifier"})).unwrap();
        assert_eq!(options.batch_size, 64);
        assert!(serde_json::from_value::<BinaryClassificationOptions>(json!({})).is_err());
    }

    #[test]
    fn test_exclusive_execution() {
        let signal = signal(Arc::new(Runtime::default()), 8);
        assert!(signal.execution().exclusive);
    }

    #[tokio::test]
    async fn test_compute_requires_setup() {
        let signal = signal(Arc::new(Runtime::default()), 8);
        assert!(signal.compute(&[Document::from("x")]).await.is_err());
    }

    #[tokio::test]
    async fn test_scores_text_and_nulls_other() {
        let runtime = Arc::new(Runtime::default());
        let mut signal = signal(Arc::clone(&runtime), 2);
        signal.setup().unwrap();
        assert_eq!(*runtime.loaded_on.lock().unwrap(), Some(DeviceKind::Cuda));

        let items = signal
            .compute(&[
                Document::from("a"),
                Document::Other(json!(3)),
                Document::from("bbb"),
                Document::from(""),
            ])
            .await
            .unwrap();

        assert_eq!(items.len(), 4);
        assert!(items[1].is_null());
        let scores = items[2].as_json().unwrap();
        assert!(scores["label_1"].as_f64().unwrap() > scores["label_0"].as_f64().unwrap());
        assert!(signal.fields().check(&items[0]).is_ok());
        assert_eq!(*runtime.calls.lock().unwrap(), vec![2, 1]);

        signal.teardown();
        signal.teardown();
        assert_eq!(signal.state(), SignalState::Released);
    }
}
