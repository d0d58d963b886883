//! Wire and ABI types for the usbchief driver core
//!
//! This crate defines the fixed-layout vendor control descriptor exchanged
//! with callers, the control operation codes, and the USB status types shared
//! between the transfer engine, recovery worker, and control relay.

pub mod error;
pub mod ioctl;
pub mod types;

pub use error::{ProtocolError, Result};
pub use ioctl::{ControlOp, VendorRequestBlock, MAX_VENDOR_READ_LEN};
pub use types::{
    ControlSetup, DeviceDescriptorInfo, TransferDirection, TransferFlags, UsbError,
};
