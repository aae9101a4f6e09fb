//! Port traits: the contract signals implement and the external collaborators
//! they consume.

pub mod detector;
pub mod runtime;
pub mod signal;

pub use detector::{require_text, CategorySpans, Detector};
pub use runtime::{select_device, DeviceProbe, LoadedModel, ModelRuntime};
pub use signal::{Lifecycle, Signal, SignalCapability, SignalState};
