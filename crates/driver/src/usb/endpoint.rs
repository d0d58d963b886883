//! Endpoint and I/O target state
//!
//! An [`Endpoint`] is one configured pipe of the selected interface,
//! addressed by ordinal. Its [`IoTarget`] gates submissions: a stopped
//! target rejects new work and cancels what is already in flight, which is
//! how a device reset quiesces the device before touching the port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use protocol::UsbError;
use tracing::debug;

use crate::usb::backend::{EndpointIo, TransferBlock};

/// Submission gate in front of one endpoint's transport
pub struct IoTarget {
    io: Arc<dyn EndpointIo>,
    started: AtomicBool,
}

impl IoTarget {
    fn new(io: Arc<dyn EndpointIo>) -> Self {
        Self {
            io,
            started: AtomicBool::new(true),
        }
    }

    /// Mark the target serviceable again
    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
    }

    /// Stop the target and cancel sent I/O
    ///
    /// In-flight submissions complete with [`UsbError::Cancelled`]; new
    /// submissions are rejected until [`start`](Self::start).
    pub fn stop_and_cancel(&self) {
        self.started.store(false, Ordering::Release);
        self.io.cancel_all();
    }

    /// Whether the target currently accepts submissions
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Submit one sub-transfer, returning its completion future
    pub fn submit(
        &self,
        block: &TransferBlock,
    ) -> Result<BoxFuture<'static, Result<Bytes, UsbError>>, UsbError> {
        if !self.is_started() {
            return Err(UsbError::Cancelled);
        }
        Ok(self.io.submit(block))
    }
}

/// One configured pipe of the selected interface
pub struct Endpoint {
    ordinal: u8,
    address: u8,
    target: IoTarget,
    ignore_packet_size_check: AtomicBool,
}

impl Endpoint {
    pub fn new(ordinal: u8, address: u8, io: Arc<dyn EndpointIo>) -> Self {
        Self {
            ordinal,
            address,
            target: IoTarget::new(io),
            ignore_packet_size_check: AtomicBool::new(false),
        }
    }

    /// Ordinal index within the interface (0..N-1)
    pub fn ordinal(&self) -> u8 {
        self.ordinal
    }

    /// Endpoint address (includes the direction bit)
    pub fn address(&self) -> u8 {
        self.address
    }

    /// The endpoint's I/O target
    pub fn target(&self) -> &IoTarget {
        &self.target
    }

    /// Disable maximum-packet-size checks for this endpoint
    ///
    /// Applied once when a stream binds the endpoint; permanent for the
    /// life of the binding.
    pub fn set_ignore_packet_size_check(&self) {
        if !self.ignore_packet_size_check.swap(true, Ordering::AcqRel) {
            debug!(ordinal = self.ordinal, "packet size check disabled");
        }
    }

    pub fn ignores_packet_size_check(&self) -> bool {
        self.ignore_packet_size_check.load(Ordering::Acquire)
    }
}

/// The configured endpoints of the selected interface, addressed by ordinal
pub struct EndpointSet {
    endpoints: Vec<Arc<Endpoint>>,
}

impl EndpointSet {
    pub fn new(endpoints: Vec<Arc<Endpoint>>) -> Self {
        Self { endpoints }
    }

    /// Look up an endpoint by ordinal
    pub fn get(&self, ordinal: u8) -> Option<&Arc<Endpoint>> {
        self.endpoints.get(ordinal as usize)
    }

    /// Number of configured endpoints
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Iterate the endpoints in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Endpoint>> {
        self.endpoints.iter()
    }
}
