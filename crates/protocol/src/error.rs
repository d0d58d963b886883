//! Protocol error types

use thiserror::Error;

/// Errors raised while decoding caller-supplied payloads
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload size does not match the fixed descriptor layout
    #[error("Invalid payload size: {actual} bytes (expected {expected})")]
    InvalidPayloadSize { expected: usize, actual: usize },

    /// Requested transfer length exceeds the relay staging buffer
    #[error("Requested length too large: {requested} bytes (max: {max})")]
    LengthTooLarge { requested: usize, max: usize },

    /// Operation code not recognized by the control relay
    #[error("Unknown control operation code: {0:#x}")]
    UnknownControlOp(u32),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
