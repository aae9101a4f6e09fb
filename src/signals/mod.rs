//! Built-in signals and the name-based registry.

pub mod binary_classification;
pub mod perplexity;
pub mod pii;
pub mod registry;

pub use binary_classification::{BinaryClassificationOptions, BinaryClassificationSignal};
pub use perplexity::{PerplexityOptions, PerplexitySignal};
pub use pii::pii;
pub use registry::{RegistryError, SignalRegistry};
