//! Per-open-handle stream state
//!
//! A stream resolves its endpoint exactly once, at open, from the caller's
//! textual identifier; the binding never changes afterward. A stream with
//! no endpoint is the driver's control handle: it accepts control calls
//! and rejects data transfers.

use std::sync::Arc;

use protocol::UsbError;
use tracing::debug;

use crate::usb::device::Device;
use crate::usb::endpoint::Endpoint;
use crate::usb::recovery::RecoveryScheduler;
use crate::usb::registry::{self, Resolution};
use crate::usb::{engine, relay};

/// One open handle onto the device
pub struct Stream {
    device: Arc<Device>,
    endpoint: Option<Arc<Endpoint>>,
    recovery: RecoveryScheduler,
}

impl Stream {
    /// Open a stream by textual identifier
    ///
    /// An empty identifier opens a control-only stream. An identifier with
    /// a trailing ordinal binds the matching endpoint or fails with
    /// invalid-request.
    pub fn open(
        device: Arc<Device>,
        name: &str,
        recovery: RecoveryScheduler,
    ) -> Result<Self, UsbError> {
        let endpoint = match registry::resolve(device.selected_interface(), name) {
            Resolution::ControlOnly => None,
            Resolution::Endpoint(endpoint) => Some(endpoint),
            Resolution::NotFound => return Err(UsbError::InvalidRequest),
        };

        debug!(
            name,
            bound = endpoint.as_ref().map(|e| e.ordinal()),
            "stream opened"
        );

        Ok(Self {
            device,
            endpoint,
            recovery,
        })
    }

    /// The endpoint this stream is bound to, if any
    pub fn endpoint(&self) -> Option<&Arc<Endpoint>> {
        self.endpoint.as_ref()
    }

    /// Read up to `dest.len()` bytes from the bound endpoint
    ///
    /// Fails immediately with invalid-parameter on a control-only stream.
    pub async fn read(&self, dest: &mut [u8]) -> Result<usize, UsbError> {
        let endpoint = self.endpoint.as_ref().ok_or(UsbError::InvalidParam)?;
        engine::run_read(&self.device, endpoint, dest, &self.recovery).await
    }

    /// Writes are not supported by this core
    pub fn write(&self, _data: &[u8]) -> Result<usize, UsbError> {
        Err(UsbError::InvalidRequest)
    }

    /// Issue a control request through the relay
    pub fn control(&self, code: u32, input: &[u8], output: &mut [u8]) -> Result<usize, UsbError> {
        relay::dispatch(&self.device, code, input, output)
    }
}
