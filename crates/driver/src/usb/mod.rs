//! USB subsystem
//!
//! The stateful heart of the driver:
//! - endpoint registry (stream-name to endpoint resolution)
//! - chunked transfer engine (bounded sub-transfers over one endpoint)
//! - recovery worker (pipe reset, then device reset, off the failing
//!   completion context)
//! - control relay (validated synchronous vendor requests)
//!
//! Recovery runs in a dedicated blocking thread so completion contexts
//! never block on a reset.

pub mod backend;
pub mod device;
pub mod endpoint;
pub mod engine;
pub mod recovery;
pub mod registry;
pub mod relay;

pub use backend::{DeviceBackend, EndpointIo, TransferBlock};
pub use device::Device;
pub use endpoint::{Endpoint, EndpointSet, IoTarget};
