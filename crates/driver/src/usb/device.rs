//! Device model and attach-time glue
//!
//! A [`Device`] caches its descriptor fields at attach and never mutates
//! them afterward. The selected interface, with its endpoint set, is
//! installed exactly once. A device reset quiesces every endpoint target
//! before touching the port and restarts them afterward, so no caller
//! observes a mid-reset endpoint.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use protocol::{DeviceDescriptorInfo, UsbError};
use tracing::{debug, info, warn};

use crate::usb::backend::{DeviceBackend, EndpointIo};
use crate::usb::endpoint::{Endpoint, EndpointSet};

/// Transport binding for one endpoint of the interface being attached
pub struct EndpointBinding {
    /// Endpoint address (includes the direction bit)
    pub address: u8,
    /// Transport servicing this endpoint
    pub io: Arc<dyn EndpointIo>,
}

/// Everything the attach-time collaborator delivers
///
/// Descriptor retrieval and interface selection happen before the core is
/// involved; this is their result.
pub struct AttachConfig {
    pub descriptor: DeviceDescriptorInfo,
    pub high_speed: bool,
    pub remote_wake_capable: bool,
    pub interface_number: u8,
    pub endpoints: Vec<EndpointBinding>,
}

/// The interface selected at attach time
pub struct SelectedInterface {
    number: u8,
    alt_setting: AtomicU8,
    endpoints: EndpointSet,
}

impl SelectedInterface {
    /// Interface number
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Currently applied alternate setting
    pub fn alt_setting(&self) -> u8 {
        self.alt_setting.load(Ordering::Acquire)
    }

    /// The interface's configured endpoints
    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }
}

/// One attached USB target
pub struct Device {
    descriptor: DeviceDescriptorInfo,
    high_speed: bool,
    remote_wake_capable: bool,
    interface: OnceLock<SelectedInterface>,
    backend: Arc<dyn DeviceBackend>,
    // Held across the whole reset sequence and any configuration mutation,
    // so neither observes the other mid-flight.
    reset_lock: Mutex<()>,
}

impl Device {
    /// Build a fully attached device
    ///
    /// One-shot collaborator glue: installs the descriptor, the selected
    /// interface, and the endpoint set. Configuration fields are read-only
    /// from here on.
    pub fn attach(backend: Arc<dyn DeviceBackend>, config: AttachConfig) -> Arc<Self> {
        let endpoints: Vec<Arc<Endpoint>> = config
            .endpoints
            .into_iter()
            .enumerate()
            .map(|(ordinal, binding)| {
                Arc::new(Endpoint::new(ordinal as u8, binding.address, binding.io))
            })
            .collect();

        let device = Self {
            descriptor: config.descriptor,
            high_speed: config.high_speed,
            remote_wake_capable: config.remote_wake_capable,
            interface: OnceLock::new(),
            backend,
            reset_lock: Mutex::new(()),
        };

        let configured = endpoints.len();
        let _ = device.interface.set(SelectedInterface {
            number: config.interface_number,
            alt_setting: AtomicU8::new(0),
            endpoints: EndpointSet::new(endpoints),
        });

        info!(
            vendor_id = format_args!("{:#06x}", device.descriptor.vendor_id),
            product_id = format_args!("{:#06x}", device.descriptor.product_id),
            high_speed = device.high_speed,
            remote_wake = device.remote_wake_capable,
            configured,
            "device attached"
        );

        Arc::new(device)
    }

    /// Build a device whose interface selection has not completed
    ///
    /// Control operations that require a selected interface fail on such
    /// a device until attach finishes.
    pub fn unconfigured(backend: Arc<dyn DeviceBackend>, descriptor: DeviceDescriptorInfo) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            high_speed: false,
            remote_wake_capable: false,
            interface: OnceLock::new(),
            backend,
            reset_lock: Mutex::new(()),
        })
    }

    /// Cached device descriptor fields
    pub fn descriptor(&self) -> &DeviceDescriptorInfo {
        &self.descriptor
    }

    pub fn is_high_speed(&self) -> bool {
        self.high_speed
    }

    pub fn is_remote_wake_capable(&self) -> bool {
        self.remote_wake_capable
    }

    /// The interface selected at attach, if attach has completed
    pub fn selected_interface(&self) -> Option<&SelectedInterface> {
        self.interface.get()
    }

    /// The selected interface's endpoint set
    pub fn endpoint_set(&self) -> Option<&EndpointSet> {
        self.interface.get().map(|i| i.endpoints())
    }

    /// The synchronous backend behind this device
    pub fn backend(&self) -> &Arc<dyn DeviceBackend> {
        &self.backend
    }

    /// Check connectivity synchronously
    pub fn is_connected(&self) -> Result<(), UsbError> {
        self.backend.is_connected()
    }

    /// Synchronously reset one endpoint
    pub fn reset_pipe(&self, ordinal: u8) -> Result<(), UsbError> {
        self.backend.reset_pipe(ordinal)
    }

    /// Apply an alternate setting on the selected interface
    ///
    /// Fails with invalid-request until an interface has been selected.
    pub fn select_alt_setting(&self, setting: u8) -> Result<(), UsbError> {
        let interface = self.interface.get().ok_or(UsbError::InvalidRequest)?;
        let _guard = self
            .reset_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.backend.select_alt_setting(setting)?;
        interface.alt_setting.store(setting, Ordering::Release);
        debug!(setting, "alternate setting applied");
        Ok(())
    }

    /// Reset the whole device
    ///
    /// Stops every endpoint's I/O target (cancelling in-flight work),
    /// verifies connectivity, resets the port if still connected, and
    /// restarts every target regardless of the reset outcome so the device
    /// is left serviceable. Reports the port-reset outcome, or the
    /// connectivity failure if the device is gone.
    pub fn reset(&self) -> Result<(), UsbError> {
        let _guard = self
            .reset_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.stop_all_pipes();

        let status = self
            .backend
            .is_connected()
            .and_then(|()| self.backend.reset_port());

        if let Err(ref err) = status {
            warn!(%err, "device reset failed");
        }

        self.start_all_pipes();
        status
    }

    fn stop_all_pipes(&self) {
        if let Some(interface) = self.interface.get() {
            for endpoint in interface.endpoints().iter() {
                endpoint.target().stop_and_cancel();
            }
            debug!(count = interface.endpoints().len(), "all pipes stopped");
        }
    }

    fn start_all_pipes(&self) {
        if let Some(interface) = self.interface.get() {
            for endpoint in interface.endpoints().iter() {
                endpoint.target().start();
            }
            debug!(count = interface.endpoints().len(), "all pipes restarted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, FakeEndpoint};

    fn descriptor() -> DeviceDescriptorInfo {
        DeviceDescriptorInfo {
            vendor_id: 0x1234,
            product_id: 0x5678,
            firmware_version: 0x0203,
            class: 0xff,
            subclass: 0,
            protocol: 0,
            num_configurations: 1,
        }
    }

    fn attach_with_endpoints(backend: Arc<FakeBackend>, count: u8) -> Arc<Device> {
        let endpoints = (0..count)
            .map(|i| EndpointBinding {
                address: 0x81 + i,
                io: Arc::new(FakeEndpoint::new()) as Arc<dyn EndpointIo>,
            })
            .collect();
        Device::attach(
            backend,
            AttachConfig {
                descriptor: descriptor(),
                high_speed: true,
                remote_wake_capable: false,
                interface_number: 0,
                endpoints,
            },
        )
    }

    #[test]
    fn test_attach_installs_interface_once() {
        let device = attach_with_endpoints(Arc::new(FakeBackend::new()), 2);
        let interface = device.selected_interface().unwrap();
        assert_eq!(interface.number(), 0);
        assert_eq!(interface.alt_setting(), 0);
        assert_eq!(interface.endpoints().len(), 2);
    }

    #[test]
    fn test_select_alt_setting_requires_interface() {
        let backend = Arc::new(FakeBackend::new());
        let device = Device::unconfigured(backend, descriptor());
        assert_eq!(
            device.select_alt_setting(1).unwrap_err(),
            UsbError::InvalidRequest
        );
    }

    #[test]
    fn test_select_alt_setting_updates_state() {
        let backend = Arc::new(FakeBackend::new());
        let device = attach_with_endpoints(backend, 1);
        device.select_alt_setting(3).unwrap();
        assert_eq!(device.selected_interface().unwrap().alt_setting(), 3);
    }

    #[test]
    fn test_alt_setting_serializes_with_reset() {
        let backend = Arc::new(FakeBackend::new());
        let device = attach_with_endpoints(backend, 2);

        let resetter = {
            let device = Arc::clone(&device);
            std::thread::spawn(move || device.reset().unwrap())
        };
        device.select_alt_setting(1).unwrap();
        resetter.join().unwrap();

        assert_eq!(device.selected_interface().unwrap().alt_setting(), 1);
        for endpoint in device.endpoint_set().unwrap().iter() {
            assert!(endpoint.target().is_started());
        }
    }

    #[test]
    fn test_reset_restarts_pipes_even_on_failure() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_port_reset();
        let device = attach_with_endpoints(backend, 2);

        assert!(device.reset().is_err());
        for endpoint in device.endpoint_set().unwrap().iter() {
            assert!(endpoint.target().is_started());
        }
    }

    #[test]
    fn test_reset_reports_disconnect_without_port_reset() {
        let backend = Arc::new(FakeBackend::new());
        backend.disconnect();
        let device = attach_with_endpoints(backend.clone(), 1);

        assert_eq!(device.reset().unwrap_err(), UsbError::Disconnected);
        let journal = backend.journal();
        assert!(journal.contains(&"is_connected".to_string()));
        assert!(!journal.contains(&"reset_port".to_string()));
    }
}
