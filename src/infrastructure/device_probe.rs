//! Host device probing from configuration

use crate::domain::models::{DeviceKind, LocalConfig};
use crate::domain::ports::DeviceProbe;

/// Reports the accelerators listed in configuration. The CPU is always
/// available.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredDeviceProbe {
    accelerators: Vec<DeviceKind>,
}

impl ConfiguredDeviceProbe {
    pub fn new(accelerators: Vec<DeviceKind>) -> Self {
        Self { accelerators }
    }

    pub fn from_config(config: &LocalConfig) -> Self {
        Self::new(config.accelerators.clone())
    }
}

impl DeviceProbe for ConfiguredDeviceProbe {
    fn is_available(&self, kind: DeviceKind) -> bool {
        kind == DeviceKind::Cpu || self.accelerators.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::select_device;

    #[test]
    fn test_cpu_only_by_default() {
        let probe = ConfiguredDeviceProbe::default();
        assert!(probe.is_available(DeviceKind::Cpu));
        assert!(!probe.is_available(DeviceKind::Cuda));
        assert_eq!(select_device(&probe), DeviceKind::Cpu);
    }

    #[test]
    fn test_configured_accelerator_selected() {
        let probe = ConfiguredDeviceProbe::from_config(&LocalConfig {
            accelerators: vec![DeviceKind::Metal],
            ..LocalConfig::default()
        });
        assert_eq!(select_device(&probe), DeviceKind::Metal);
    }
}
