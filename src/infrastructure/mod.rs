//! Infrastructure layer module
//!
//! Adapters behind the domain ports and the process-level plumbing:
//! - Remote signal service client and line codec
//! - Span detectors used by composite signals
//! - Device probing and the model runtime fallback
//! - Configuration, logging and credentials

pub mod config;
pub mod credentials;
pub mod detectors;
pub mod device_probe;
pub mod logging;
pub mod remote;
pub mod runtime;
