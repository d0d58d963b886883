//! usbchief driver core
//!
//! The data-transfer and fault-recovery core of a USB function driver.
//! Moves bytes between callers and one endpoint of the attached device,
//! splitting large reads into bounded sub-transfers, and recovers from
//! transfer failures by resetting the failing endpoint or, failing that,
//! the whole device. Vendor control requests pass through a strict
//! validating relay.
//!
//! Hardware access lives behind the [`usb::backend`] traits; the core
//! itself carries no USB protocol semantics.

pub mod config;
pub mod core;
pub mod stream;
pub mod testing;
pub mod usb;

pub use crate::core::DriverCore;
pub use config::DriverConfig;
pub use stream::Stream;
pub use usb::device::{AttachConfig, Device, EndpointBinding, SelectedInterface};
pub use usb::engine::MAX_TRANSFER_SIZE;
pub use usb::recovery::{RecoveryAction, RecoveryOutcome, RecoveryScheduler};
