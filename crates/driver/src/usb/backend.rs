//! Transport seam
//!
//! The core consumes an abstraction of "an endpoint accepts bounded byte
//! transfers and reports completion status". Everything hardware-specific
//! (host controller access, URB plumbing) lives behind these traits; the
//! in-memory test transport in [`crate::testing`] implements them too.

use bytes::Bytes;
use futures::future::BoxFuture;
use protocol::{ControlSetup, TransferDirection, TransferFlags, UsbError};

/// One bounded sub-transfer, rebuilt by the engine for every stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferBlock {
    /// Endpoint address the stage targets
    pub endpoint_address: u8,
    /// Transfer direction (the engine only issues In)
    pub direction: TransferDirection,
    /// Requested stage length in bytes
    pub length: u32,
    /// Stage flags (short-transfer-OK for chunked reads)
    pub flags: TransferFlags,
}

/// Asynchronous bounded transfers against one endpoint
///
/// `submit` resolves with the bytes actually moved, which may be fewer
/// than requested when the block allows short transfers. Completion may
/// run on an arbitrary execution context; implementations must not assume
/// the submitter's context.
pub trait EndpointIo: Send + Sync {
    /// Submit one sub-transfer and return its completion future
    fn submit(&self, block: &TransferBlock) -> BoxFuture<'static, Result<Bytes, UsbError>>;

    /// Abort every in-flight submission on this endpoint
    fn cancel_all(&self);
}

/// Synchronous, possibly-blocking device operations
///
/// Only ever called from worker threads (recovery) or the relay's
/// synchronous path, never from a completion context.
pub trait DeviceBackend: Send + Sync {
    /// Reset a single endpoint by ordinal
    fn reset_pipe(&self, ordinal: u8) -> Result<(), UsbError>;

    /// Verify the device is still connected
    fn is_connected(&self) -> Result<(), UsbError>;

    /// Reset the device's port
    fn reset_port(&self) -> Result<(), UsbError>;

    /// Issue a vendor, device-directed control write
    ///
    /// `length` and `buffer` come verbatim from the caller's descriptor;
    /// returns the byte count actually transferred.
    fn vendor_write(&self, setup: ControlSetup, length: u16, buffer: u32) -> Result<u32, UsbError>;

    /// Issue a vendor, device-directed control read into `staging`
    ///
    /// Returns the byte count actually returned by the device.
    fn vendor_read(
        &self,
        setup: ControlSetup,
        staging: &mut [u8],
        flags: TransferFlags,
    ) -> Result<u32, UsbError>;

    /// Apply an alternate setting on the selected interface
    fn select_alt_setting(&self, setting: u8) -> Result<(), UsbError>;

    /// Configure idle/wake power policy (attach-time, remote-wake devices)
    fn set_power_policy(&self, idle_timeout_ms: u64, allow_remote_wake: bool)
        -> Result<(), UsbError>;
}
