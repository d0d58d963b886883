//! Vendor control descriptor and operation codes
//!
//! Callers hand the control relay a fixed-layout little-endian descriptor
//! naming a vendor request. The layout is part of the driver's ABI and is
//! validated byte-for-byte before any transport call is issued.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Largest vendor read the relay will stage (bytes)
pub const MAX_VENDOR_READ_LEN: usize = 4096;

/// Control operation codes accepted by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlOp {
    /// Vendor-defined write (host to device)
    VendorWrite,
    /// Vendor-defined read (device to host)
    VendorRead,
    /// Apply an alternate setting on the selected interface
    SelectConfiguration,
    /// Return the device descriptor's firmware-version field
    GetFirmwareVersion,
}

impl ControlOp {
    /// Map a caller-visible operation code; unknown codes are rejected.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(ControlOp::VendorWrite),
            1 => Ok(ControlOp::VendorRead),
            2 => Ok(ControlOp::SelectConfiguration),
            3 => Ok(ControlOp::GetFirmwareVersion),
            other => Err(ProtocolError::UnknownControlOp(other)),
        }
    }

    /// The operation code for this variant
    pub fn code(&self) -> u32 {
        match self {
            ControlOp::VendorWrite => 0,
            ControlOp::VendorRead => 1,
            ControlOp::SelectConfiguration => 2,
            ControlOp::GetFirmwareVersion => 3,
        }
    }
}

/// Fixed-layout vendor request descriptor
///
/// Packed little-endian layout, 12 bytes total:
/// `request:1, reserved:1, value:2, index:2, length:2, buffer:4`.
/// `buffer` is the caller's cookie for its own payload region; the relay
/// never dereferences it, it only echoes lengths back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRequestBlock {
    /// Vendor request byte (bRequest)
    pub request: u8,
    /// Reserved, preserved but ignored
    pub reserved: u8,
    /// Value parameter (wValue)
    pub value: u16,
    /// Index parameter (wIndex)
    pub index: u16,
    /// Transfer length in bytes
    pub length: u16,
    /// Caller buffer cookie
    pub buffer: u32,
}

impl VendorRequestBlock {
    /// Encoded size of the descriptor
    pub const ENCODED_LEN: usize = 12;

    /// Decode a descriptor from a caller payload
    ///
    /// The payload must be exactly [`Self::ENCODED_LEN`] bytes; anything
    /// else is a parameter error detected before any I/O.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() != Self::ENCODED_LEN {
            return Err(ProtocolError::InvalidPayloadSize {
                expected: Self::ENCODED_LEN,
                actual: payload.len(),
            });
        }

        Ok(Self {
            request: payload[0],
            reserved: payload[1],
            value: LittleEndian::read_u16(&payload[2..4]),
            index: LittleEndian::read_u16(&payload[4..6]),
            length: LittleEndian::read_u16(&payload[6..8]),
            buffer: LittleEndian::read_u32(&payload[8..12]),
        })
    }

    /// Encode the descriptor into its wire layout
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0] = self.request;
        out[1] = self.reserved;
        LittleEndian::write_u16(&mut out[2..4], self.value);
        LittleEndian::write_u16(&mut out[4..6], self.index);
        LittleEndian::write_u16(&mut out[6..8], self.length);
        LittleEndian::write_u32(&mut out[8..12], self.buffer);
        out
    }

    /// Validate the requested length against the relay staging buffer
    pub fn check_read_length(&self) -> Result<()> {
        let requested = self.length as usize;
        if requested > MAX_VENDOR_READ_LEN {
            return Err(ProtocolError::LengthTooLarge {
                requested,
                max: MAX_VENDOR_READ_LEN,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_layout() {
        let mut raw = [0u8; VendorRequestBlock::ENCODED_LEN];
        raw[0] = 0xa5; // request
        raw[1] = 0x00; // reserved
        raw[2..4].copy_from_slice(&0x0102u16.to_le_bytes());
        raw[4..6].copy_from_slice(&0x0304u16.to_le_bytes());
        raw[6..8].copy_from_slice(&512u16.to_le_bytes());
        raw[8..12].copy_from_slice(&0xdeadbeefu32.to_le_bytes());

        let block = VendorRequestBlock::parse(&raw).unwrap();
        assert_eq!(block.request, 0xa5);
        assert_eq!(block.value, 0x0102);
        assert_eq!(block.index, 0x0304);
        assert_eq!(block.length, 512);
        assert_eq!(block.buffer, 0xdeadbeef);
    }

    #[test]
    fn test_parse_rejects_wrong_size() {
        for len in [0usize, 1, 11, 13, 64] {
            let payload = vec![0u8; len];
            let err = VendorRequestBlock::parse(&payload).unwrap_err();
            assert_eq!(
                err,
                ProtocolError::InvalidPayloadSize {
                    expected: VendorRequestBlock::ENCODED_LEN,
                    actual: len,
                }
            );
        }
    }

    #[test]
    fn test_encode_parse_round_trip() {
        let block = VendorRequestBlock {
            request: 0x42,
            reserved: 0,
            value: 7,
            index: 9,
            length: 4096,
            buffer: 0x1000,
        };
        assert_eq!(VendorRequestBlock::parse(&block.encode()).unwrap(), block);
    }

    #[test]
    fn test_read_length_bound() {
        let mut block = VendorRequestBlock {
            request: 1,
            reserved: 0,
            value: 0,
            index: 0,
            length: MAX_VENDOR_READ_LEN as u16,
            buffer: 0,
        };
        assert!(block.check_read_length().is_ok());

        block.length = (MAX_VENDOR_READ_LEN + 1) as u16;
        assert!(matches!(
            block.check_read_length(),
            Err(ProtocolError::LengthTooLarge { .. })
        ));
    }

    #[test]
    fn test_control_op_codes() {
        for op in [
            ControlOp::VendorWrite,
            ControlOp::VendorRead,
            ControlOp::SelectConfiguration,
            ControlOp::GetFirmwareVersion,
        ] {
            assert_eq!(ControlOp::from_code(op.code()).unwrap(), op);
        }
        assert!(matches!(
            ControlOp::from_code(17),
            Err(ProtocolError::UnknownControlOp(17))
        ));
    }
}
