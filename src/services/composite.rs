//! Composite signals: several independent detectors merged into one Item.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::errors::DetectorError;
use crate::domain::models::{Document, ExecutionConfig, Field, Item, Span};
use crate::domain::ports::{
    require_text, Detector, Lifecycle, Signal, SignalCapability, SignalState,
};

/// A signal whose Item is the union of its detectors' outputs.
///
/// Every declared category is present in the Item, possibly as an empty list.
/// Categories a detector emits outside the declared set are dropped. A
/// document no detector can read yields a null Item.
pub struct CompositeSignal {
    name: String,
    categories: Vec<String>,
    detectors: Vec<Box<dyn Detector>>,
    execution: ExecutionConfig,
    remote_operation: Option<String>,
    lifecycle: Lifecycle,
}

impl CompositeSignal {
    pub fn new<I, S>(name: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            categories: categories.into_iter().map(Into::into).collect(),
            detectors: Vec::new(),
            execution: ExecutionConfig::default(),
            remote_operation: None,
            lifecycle: Lifecycle::new(),
        }
    }

    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    #[must_use]
    pub const fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    /// Remote operation that computes the whole composite service-side
    #[must_use]
    pub fn with_remote_operation(mut self, operation: impl Into<String>) -> Self {
        self.remote_operation = Some(operation.into());
        self
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Run every detector on `document` and union their spans
    pub fn merge(&self, document: &Document) -> Result<Item, DetectorError> {
        if require_text(document).is_err() {
            return Ok(Item::Null);
        }

        let mut merged: BTreeMap<&str, Vec<Span>> = self
            .categories
            .iter()
            .map(|category| (category.as_str(), Vec::new()))
            .collect();

        for detector in &self.detectors {
            let found = match detector.detect(document) {
                Ok(found) => found,
                Err(DetectorError::NonTextInput) => return Ok(Item::Null),
                Err(err) => return Err(err),
            };
            for (category, spans) in found {
                match merged.get_mut(category.as_str()) {
                    Some(existing) => existing.extend(spans),
                    None => debug!(
                        signal = %self.name,
                        detector = detector.name(),
                        %category,
                        "Dropping undeclared category"
                    ),
                }
            }
        }

        let mut object = Map::new();
        for (category, mut spans) in merged {
            spans.sort_unstable();
            spans.dedup();
            let spans = spans
                .into_iter()
                .map(|span| serde_json::json!({"start": span.start, "end": span.end}))
                .collect();
            object.insert(category.to_string(), Value::Array(spans));
        }
        Ok(Item::Json(Value::Object(object)))
    }
}

#[async_trait]
impl Signal for CompositeSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> Field {
        Field::map(
            self.categories
                .iter()
                .map(|category| (category.clone(), Field::SpanList)),
        )
    }

    fn capability(&self) -> SignalCapability {
        SignalCapability::Composite {
            remote_operation: self.remote_operation.clone(),
        }
    }

    fn execution(&self) -> ExecutionConfig {
        self.execution
    }

    fn state(&self) -> SignalState {
        self.lifecycle.state()
    }

    fn setup(&mut self) -> anyhow::Result<()> {
        self.lifecycle.mark_ready();
        Ok(())
    }

    fn teardown(&mut self) {
        self.lifecycle.release();
    }

    async fn compute(&self, batch: &[Document]) -> anyhow::Result<Vec<Item>> {
        Ok(batch
            .iter()
            .map(|document| self.merge(document))
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CategorySpans;
    use serde_json::json;

    struct Fixed {
        name: &'static str,
        output: Vec<(&'static str, Vec<Span>)>,
    }

    impl Detector for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn categories(&self) -> Vec<String> {
            self.output.iter().map(|(c, _)| (*c).to_string()).collect()
        }

        fn detect(&self, document: &Document) -> Result<CategorySpans, DetectorError> {
            crate::domain::ports::require_text(document)?;
            Ok(self
                .output
                .iter()
                .map(|(c, spans)| ((*c).to_string(), spans.clone()))
                .collect())
        }
    }

    struct Broken;

    impl Detector for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn categories(&self) -> Vec<String> {
            Vec::new()
        }

        fn detect(&self, _document: &Document) -> Result<CategorySpans, DetectorError> {
            Err(DetectorError::Failed {
                detector: "broken".to_string(),
                reason: "model missing".to_string(),
            })
        }
    }

    fn composite() -> CompositeSignal {
        CompositeSignal::new("combo", ["a", "b", "c"])
            .with_detector(Box::new(Fixed {
                name: "first",
                output: vec![("a", vec![Span::new(5, 7), Span::new(0, 2)])],
            }))
            .with_detector(Box::new(Fixed {
                name: "second",
                output: vec![("a", vec![Span::new(0, 2)]), ("b", vec![Span::new(1, 3)]), ("zzz", vec![Span::new(0, 1)])],
            }))
    }

    #[test]
    fn test_union_with_all_declared_keys() {
        let item = composite().merge(&Document::from("some text")).unwrap();
        assert_eq!(
            item,
            Item::Json(json!({
                "a": [{"start": 0, "end": 2}, {"start": 5, "end": 7}],
                "b": [{"start": 1, "end": 3}],
                "c": []
            }))
        );
        assert!(composite().fields().check(&item).is_ok());
    }

    #[test]
    fn test_non_text_is_null() {
        let item = composite().merge(&Document::Other(json!({"bytes": 12}))).unwrap();
        assert!(item.is_null());
    }

    struct AcceptsAnything;

    impl Detector for AcceptsAnything {
        fn name(&self) -> &str {
            "lenient"
        }

        fn categories(&self) -> Vec<String> {
            vec!["a".to_string()]
        }

        fn detect(&self, _document: &Document) -> Result<CategorySpans, DetectorError> {
            Ok(CategorySpans::from([("a".to_string(), vec![Span::new(0, 1)])]))
        }
    }

    #[test]
    fn test_non_text_is_null_whatever_detectors_return() {
        let bare = CompositeSignal::new("combo", ["a"]);
        assert!(bare.merge(&Document::Other(json!({"bytes": 3}))).unwrap().is_null());

        let lenient =
            CompositeSignal::new("combo", ["a"]).with_detector(Box::new(AcceptsAnything));
        assert!(lenient.merge(&Document::Other(json!(42))).unwrap().is_null());
        assert!(!lenient.merge(&Document::from("text")).unwrap().is_null());
    }

    #[test]
    fn test_detector_failure_propagates() {
        let signal = CompositeSignal::new("combo", ["a"]).with_detector(Box::new(Broken));
        assert!(matches!(
            signal.merge(&Document::from("x")),
            Err(DetectorError::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_compute_batch() {
        let signal = composite();
        let items = signal
            .compute(&[Document::from("one"), Document::Other(json!(1)), Document::from("two")])
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
        assert!(!items[0].is_null());
        assert!(items[1].is_null());
    }

    #[test]
    fn test_capability_and_lifecycle() {
        let mut signal = composite().with_remote_operation("combo");
        assert_eq!(signal.capability().remote_operation(), Some("combo"));
        signal.setup().unwrap();
        assert_eq!(signal.state(), SignalState::Ready);
        signal.teardown();
        signal.teardown();
        assert_eq!(signal.state(), SignalState::Released);
    }
}
