//! Driver core facade
//!
//! Owns the attached device and the recovery worker, and hands out
//! streams. Attach is the only place configuration is consulted: the
//! power policy is applied once, to remote-wake-capable devices, and a
//! policy failure is logged but never fails the attach.

use std::sync::Arc;
use std::thread::JoinHandle;

use protocol::UsbError;
use tracing::{debug, warn};

use crate::config::DriverConfig;
use crate::stream::Stream;
use crate::usb::backend::DeviceBackend;
use crate::usb::device::{AttachConfig, Device};
use crate::usb::recovery::{spawn_recovery_worker, RecoveryOutcome, RecoveryScheduler};

/// The assembled driver: device, recovery worker, stream factory
pub struct DriverCore {
    device: Arc<Device>,
    recovery: RecoveryScheduler,
    _worker: JoinHandle<()>,
}

impl DriverCore {
    /// Attach a device and bring up the recovery worker
    pub fn attach(
        backend: Arc<dyn DeviceBackend>,
        attach: AttachConfig,
        settings: &DriverConfig,
    ) -> Self {
        let device = Device::attach(backend, attach);

        if device.is_remote_wake_capable() && settings.power.allow_remote_wake {
            if let Err(err) = device
                .backend()
                .set_power_policy(settings.power.idle_timeout_ms, true)
            {
                warn!(%err, "power policy not applied");
            } else {
                debug!(
                    idle_timeout_ms = settings.power.idle_timeout_ms,
                    "power policy applied"
                );
            }
        }

        let (recovery, worker) = spawn_recovery_worker();
        Self {
            device,
            recovery,
            _worker: worker,
        }
    }

    /// The attached device
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Open a stream by textual identifier
    pub fn open_stream(&self, name: &str) -> Result<Stream, UsbError> {
        Stream::open(Arc::clone(&self.device), name, self.recovery.clone())
    }

    /// Await the next recovery outcome event
    pub async fn next_recovery_outcome(&self) -> common::Result<RecoveryOutcome> {
        self.recovery.next_outcome().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use crate::usb::backend::EndpointIo;
    use crate::usb::device::EndpointBinding;
    use protocol::DeviceDescriptorInfo;

    fn attach_config(backend: &FakeBackend, remote_wake: bool) -> AttachConfig {
        AttachConfig {
            descriptor: DeviceDescriptorInfo {
                vendor_id: 0x1234,
                product_id: 0x5678,
                firmware_version: 0x0100,
                class: 0xff,
                subclass: 0,
                protocol: 0,
                num_configurations: 1,
            },
            high_speed: true,
            remote_wake_capable: remote_wake,
            interface_number: 0,
            endpoints: vec![EndpointBinding {
                address: 0x81,
                io: backend.endpoint(0) as Arc<dyn EndpointIo>,
            }],
        }
    }

    #[test]
    fn test_attach_applies_power_policy_to_wake_capable_device() {
        let backend = Arc::new(FakeBackend::new());
        let config = attach_config(&backend, true);
        let _core = DriverCore::attach(backend.clone(), config, &DriverConfig::default());

        assert!(backend
            .journal()
            .contains(&"set_power_policy 10000 true".to_string()));
    }

    #[test]
    fn test_attach_skips_power_policy_without_wake_capability() {
        let backend = Arc::new(FakeBackend::new());
        let config = attach_config(&backend, false);
        let _core = DriverCore::attach(backend.clone(), config, &DriverConfig::default());

        assert!(backend.journal().is_empty());
    }

    #[test]
    fn test_open_stream_resolution() {
        let backend = Arc::new(FakeBackend::new());
        let config = attach_config(&backend, false);
        let core = DriverCore::attach(backend, config, &DriverConfig::default());

        let control = core.open_stream("").unwrap();
        assert!(control.endpoint().is_none());

        let bound = core.open_stream("pipe0").unwrap();
        assert_eq!(bound.endpoint().unwrap().ordinal(), 0);

        assert!(matches!(
            core.open_stream("pipe7"),
            Err(UsbError::InvalidRequest)
        ));
    }
}
