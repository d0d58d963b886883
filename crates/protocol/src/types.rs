//! Shared USB type definitions
//!
//! Types consumed by the transfer engine, the recovery worker, and the
//! control relay. Device descriptor fields are cached once at attach time
//! and never change afterward.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cached device descriptor fields
///
/// Populated by the attach-time lifecycle glue and read-only for the life
/// of the device. `firmware_version` is the descriptor's bcdDevice field,
/// returned verbatim by the firmware-version control operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceDescriptorInfo {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Device firmware version (bcdDevice)
    pub firmware_version: u16,
    /// USB device class
    pub class: u8,
    /// USB device subclass
    pub subclass: u8,
    /// USB device protocol
    pub protocol: u8,
    /// Number of configurations
    pub num_configurations: u8,
}

/// Transfer direction relative to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    /// Device to host
    In,
    /// Host to device
    Out,
}

/// Per-transfer flags
///
/// `short_ok` marks a short completion as legitimate end-of-data rather
/// than a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFlags {
    pub short_ok: bool,
}

impl TransferFlags {
    /// Flags for a chunked IN stage: short transfers end the job cleanly.
    pub const IN_SHORT_OK: Self = Self { short_ok: true };
}

/// Setup fields of a vendor-directed control transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSetup {
    /// Vendor request byte (bRequest)
    pub request: u8,
    /// Value parameter (wValue)
    pub value: u16,
    /// Index parameter (wIndex)
    pub index: u16,
}

/// USB transfer and recovery error conditions
///
/// Reported by the transport seam and surfaced as the final status of the
/// affected request. Every failing call carries exactly one of these.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum UsbError {
    /// Transfer timed out
    #[error("transfer timed out")]
    Timeout,
    /// Endpoint stalled
    #[error("endpoint stalled")]
    Stall,
    /// Device no longer connected
    #[error("device disconnected")]
    Disconnected,
    /// Endpoint or device not found
    #[error("not found")]
    NotFound,
    /// Caller-supplied parameter invalid (no endpoint bound, bad buffer)
    #[error("invalid parameter")]
    InvalidParam,
    /// Request shape not recognized or not permitted
    #[error("invalid request")]
    InvalidRequest,
    /// Resource allocation failed mid-job
    #[error("out of resources")]
    OutOfResources,
    /// In-flight work cancelled by an endpoint stop
    #[error("cancelled")]
    Cancelled,
    /// Lower I/O layer reported a transport fault
    #[error("transport I/O error")]
    Io,
    /// Anything else, with detail
    #[error("{message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usb_error_equality() {
        assert_eq!(UsbError::Stall, UsbError::Stall);
        assert_ne!(UsbError::Stall, UsbError::Timeout);
    }

    #[test]
    fn test_descriptor_info_is_copy() {
        let info = DeviceDescriptorInfo {
            vendor_id: 0x1234,
            product_id: 0x5678,
            firmware_version: 0x0102,
            class: 0xff,
            subclass: 0,
            protocol: 0,
            num_configurations: 1,
        };
        let copied = info;
        assert_eq!(info, copied);
    }

    #[test]
    fn test_in_short_ok_flags() {
        assert!(TransferFlags::IN_SHORT_OK.short_ok);
    }
}
