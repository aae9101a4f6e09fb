//! Compute devices that model-backed signals bind to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of compute device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Dedicated accelerator (NVIDIA GPU)
    Cuda,
    /// Unified-memory accelerator (Apple Silicon)
    Metal,
    /// General-purpose CPU
    Cpu,
}

impl DeviceKind {
    /// Probe order used by [`crate::domain::ports::select_device`]
    pub const PREFERENCE: [Self; 3] = [Self::Cuda, Self::Metal, Self::Cpu];
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cuda => "cuda",
            Self::Metal => "metal",
            Self::Cpu => "cpu",
        };
        f.write_str(name)
    }
}
