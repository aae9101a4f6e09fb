use std::collections::BTreeMap;

use crate::domain::errors::DetectorError;
use crate::domain::models::{Document, Span};

/// Spans found in one document, keyed by category name
pub type CategorySpans = BTreeMap<String, Vec<Span>>;

/// An independent detector run as part of a composite signal
pub trait Detector: Send + Sync {
    /// Detector name, used in logs and errors
    fn name(&self) -> &str;

    /// Category keys this detector may emit
    fn categories(&self) -> Vec<String>;

    /// Detect spans in `document`.
    ///
    /// Returns [`DetectorError::NonTextInput`] for documents the detector
    /// cannot read.
    fn detect(&self, document: &Document) -> Result<CategorySpans, DetectorError>;
}

/// Borrow the document text or fail with `NonTextInput`
pub fn require_text(document: &Document) -> Result<&str, DetectorError> {
    document.as_text().ok_or(DetectorError::NonTextInput)
}
