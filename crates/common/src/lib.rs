//! Common utilities for usbchief
//!
//! Shared plumbing between the driver core and its collaborators: error
//! handling, the logging configuration object, and the deferred-work
//! channel bridge used to move blocking recovery work off completion
//! contexts.

pub mod channel;
pub mod error;
pub mod logging;

pub use channel::{work_channel, WorkHandle, WorkerEnd};
pub use error::{Error, Result};
pub use logging::{setup_logging, AreaLevel, LogConfig};
