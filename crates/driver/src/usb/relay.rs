//! Control relay
//!
//! Stateless pass-through of vendor-defined control requests and
//! configuration selection. Every request is validated in full before any
//! transport call; every outcome is a status plus an exact byte count
//! (`Ok(n)` or an error implying zero bytes).

use protocol::{ControlOp, ControlSetup, TransferFlags, UsbError, VendorRequestBlock,
    MAX_VENDOR_READ_LEN};
use tracing::{debug, warn};

use crate::usb::device::Device;

/// Dispatch one control request by operation code
///
/// Unknown codes and malformed payloads fail with invalid-request and no
/// side effects.
pub fn dispatch(
    device: &Device,
    code: u32,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, UsbError> {
    let op = match ControlOp::from_code(code) {
        Ok(op) => op,
        Err(err) => {
            debug!(code, %err, "unknown control operation");
            return Err(UsbError::InvalidRequest);
        }
    };

    match op {
        ControlOp::VendorWrite => vendor_write(device, input),
        ControlOp::VendorRead => vendor_read(device, input, output),
        ControlOp::SelectConfiguration => select_configuration(device, input),
        ControlOp::GetFirmwareVersion => get_firmware_version(device, output),
    }
}

fn parse_block(input: &[u8]) -> Result<VendorRequestBlock, UsbError> {
    VendorRequestBlock::parse(input).map_err(|err| {
        warn!(%err, payload_len = input.len(), "malformed vendor descriptor");
        UsbError::InvalidRequest
    })
}

fn setup_of(block: &VendorRequestBlock) -> ControlSetup {
    ControlSetup {
        request: block.request,
        value: block.value,
        index: block.index,
    }
}

fn vendor_write(device: &Device, input: &[u8]) -> Result<usize, UsbError> {
    let block = parse_block(input)?;

    debug!(
        request = format_args!("{:#04x}", block.request),
        value = block.value,
        index = block.index,
        length = block.length,
        "vendor write"
    );

    let sent = device
        .backend()
        .vendor_write(setup_of(&block), block.length, block.buffer)?;
    Ok(sent as usize)
}

fn vendor_read(device: &Device, input: &[u8], output: &mut [u8]) -> Result<usize, UsbError> {
    let block = parse_block(input)?;

    if block.check_read_length().is_err() {
        warn!(
            length = block.length,
            max = MAX_VENDOR_READ_LEN,
            "vendor read exceeds staging buffer"
        );
        return Err(UsbError::InvalidRequest);
    }
    let requested = block.length as usize;
    if output.len() < requested {
        warn!(
            requested,
            available = output.len(),
            "vendor read output buffer too small"
        );
        return Err(UsbError::InvalidParam);
    }

    debug!(
        request = format_args!("{:#04x}", block.request),
        value = block.value,
        index = block.index,
        length = block.length,
        "vendor read"
    );

    let mut staging = [0u8; MAX_VENDOR_READ_LEN];
    let returned = device.backend().vendor_read(
        setup_of(&block),
        &mut staging[..requested],
        TransferFlags::IN_SHORT_OK,
    )? as usize;

    let returned = returned.min(requested);
    output[..returned].copy_from_slice(&staging[..returned]);
    Ok(returned)
}

fn select_configuration(device: &Device, input: &[u8]) -> Result<usize, UsbError> {
    if input.len() != 1 {
        warn!(payload_len = input.len(), "select configuration payload must be one byte");
        return Err(UsbError::InvalidRequest);
    }

    debug!(setting = input[0], "select configuration");
    device.select_alt_setting(input[0])?;
    Ok(0)
}

fn get_firmware_version(device: &Device, output: &mut [u8]) -> Result<usize, UsbError> {
    if output.len() != 2 {
        warn!(buffer_len = output.len(), "firmware version buffer must be two bytes");
        return Err(UsbError::InvalidRequest);
    }

    output.copy_from_slice(&device.descriptor().firmware_version.to_le_bytes());
    Ok(2)
}
