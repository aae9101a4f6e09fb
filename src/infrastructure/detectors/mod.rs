//! Built-in regex detectors used by the `pii` signal

pub mod patterns;
pub mod secrets;

pub use patterns::{PatternDetector, PII_CATEGORIES};
pub use secrets::{SecretsDetector, SECRETS};
