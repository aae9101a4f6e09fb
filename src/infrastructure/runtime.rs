//! Model runtime used when no inference backend is linked in.

use anyhow::Result;

use crate::domain::models::DeviceKind;
use crate::domain::ports::{LoadedModel, ModelRuntime};

/// Fails every load. Model-backed signals can then only run remotely.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRuntime;

impl ModelRuntime for UnavailableRuntime {
    fn load(&self, model_id: &str, device: DeviceKind) -> Result<Box<dyn LoadedModel>> {
        anyhow::bail!(
            "cannot load model '{model_id}' on {device}: no local model runtime is available, offload the signal with --remote"
        )
    }
}
