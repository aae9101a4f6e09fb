//! Domain layer: data model, errors and port traits.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DetectorError, SignalError, SignalResult};
