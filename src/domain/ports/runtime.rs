use anyhow::Result;
use tracing::debug;

use crate::domain::models::DeviceKind;

/// Reports which compute devices the host offers
pub trait DeviceProbe: Send + Sync {
    fn is_available(&self, kind: DeviceKind) -> bool;
}

/// Pick the first available device in [`DeviceKind::PREFERENCE`] order.
///
/// The CPU is the fallback even if the probe does not report it.
pub fn select_device(probe: &dyn DeviceProbe) -> DeviceKind {
    let device = DeviceKind::PREFERENCE
        .into_iter()
        .find(|kind| probe.is_available(*kind))
        .unwrap_or(DeviceKind::Cpu);
    debug!(%device, "Selected compute device");
    device
}

/// Loads models onto a device.
///
/// Implementations wrap a concrete inference runtime. The returned handle is
/// owned by the signal instance that requested it.
pub trait ModelRuntime: Send + Sync {
    fn load(&self, model_id: &str, device: DeviceKind) -> Result<Box<dyn LoadedModel>>;
}

/// A model bound to a device
pub trait LoadedModel: Send + Sync {
    /// Run one batch of texts, returning one raw output vector per text
    /// (logits, scores...)
    fn run(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Device the model lives on
    fn device(&self) -> DeviceKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe(Vec<DeviceKind>);

    impl DeviceProbe for Probe {
        fn is_available(&self, kind: DeviceKind) -> bool {
            self.0.contains(&kind)
        }
    }

    #[test]
    fn test_prefers_dedicated_accelerator() {
        let probe = Probe(vec![DeviceKind::Cpu, DeviceKind::Metal, DeviceKind::Cuda]);
        assert_eq!(select_device(&probe), DeviceKind::Cuda);
    }

    #[test]
    fn test_unified_memory_before_cpu() {
        let probe = Probe(vec![DeviceKind::Metal, DeviceKind::Cpu]);
        assert_eq!(select_device(&probe), DeviceKind::Metal);
    }

    #[test]
    fn test_falls_back_to_cpu() {
        assert_eq!(select_device(&Probe(vec![])), DeviceKind::Cpu);
    }
}
