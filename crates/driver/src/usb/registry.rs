//! Endpoint registry
//!
//! Resolves the textual identifier of a newly opened stream to a concrete
//! endpoint. The identifier's trailing decimal run names the endpoint
//! ordinal; an empty identifier opens the driver's own control handle.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::usb::device::SelectedInterface;
use crate::usb::endpoint::Endpoint;

/// Result of resolving a stream identifier
pub enum Resolution {
    /// Empty identifier: a control-only stream, no endpoint requested
    ControlOnly,
    /// Identifier named an existing endpoint
    Endpoint(Arc<Endpoint>),
    /// No trailing ordinal, ordinal out of range, or no interface selected
    NotFound,
}

/// Resolve a stream identifier against the selected interface
///
/// Scans the identifier from its end, skips non-digit characters, then
/// parses the maximal run of trailing decimal digits as the endpoint
/// ordinal. Ordinals wider than the endpoint-index range are rejected
/// rather than truncated. On success the endpoint's packet-size check is
/// disabled, permanently, for the life of the stream. No side effects on
/// failure.
pub fn resolve(interface: Option<&SelectedInterface>, name: &str) -> Resolution {
    if name.is_empty() {
        return Resolution::ControlOnly;
    }

    let Some(interface) = interface else {
        warn!(name, "stream open before interface selection");
        return Resolution::NotFound;
    };

    let Some(ordinal) = trailing_ordinal(name) else {
        debug!(name, "no endpoint ordinal in stream name");
        return Resolution::NotFound;
    };

    match interface.endpoints().get(ordinal) {
        Some(endpoint) => {
            endpoint.set_ignore_packet_size_check();
            debug!(name, ordinal, "stream bound to endpoint");
            Resolution::Endpoint(Arc::clone(endpoint))
        }
        None => {
            debug!(
                name,
                ordinal,
                configured = interface.endpoints().len(),
                "endpoint ordinal out of range"
            );
            Resolution::NotFound
        }
    }
}

/// Parse the maximal trailing decimal run of `name` as an ordinal
///
/// Returns `None` if there is no digit run or the parsed value exceeds the
/// endpoint-index range.
fn trailing_ordinal(name: &str) -> Option<u8> {
    let bytes = name.as_bytes();

    let end = bytes.iter().rposition(|b| b.is_ascii_digit())? + 1;
    let start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut value: u32 = 0;
    for &digit in &bytes[start..end] {
        value = value.checked_mul(10)?.checked_add((digit - b'0') as u32)?;
        if value > u8::MAX as u32 {
            warn!(name, value, "endpoint ordinal exceeds index range");
            return None;
        }
    }
    Some(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use crate::usb::backend::EndpointIo;
    use crate::usb::device::{AttachConfig, Device, EndpointBinding};
    use protocol::DeviceDescriptorInfo;

    fn device_with_endpoints(count: u8) -> Arc<Device> {
        let backend = Arc::new(FakeBackend::new());
        let endpoints = (0..count)
            .map(|i| EndpointBinding {
                address: 0x81 + i,
                io: backend.endpoint(i) as Arc<dyn EndpointIo>,
            })
            .collect();
        Device::attach(
            backend,
            AttachConfig {
                descriptor: DeviceDescriptorInfo {
                    vendor_id: 1,
                    product_id: 2,
                    firmware_version: 3,
                    class: 0xff,
                    subclass: 0,
                    protocol: 0,
                    num_configurations: 1,
                },
                high_speed: false,
                remote_wake_capable: false,
                interface_number: 0,
                endpoints,
            },
        )
    }

    #[test]
    fn test_resolve_against_interface() {
        let device = device_with_endpoints(4);
        let interface = device.selected_interface();

        assert!(matches!(resolve(interface, ""), Resolution::ControlOnly));
        assert!(matches!(resolve(interface, "foo"), Resolution::NotFound));
        assert!(matches!(resolve(interface, "foo12"), Resolution::NotFound));

        match resolve(interface, "foo3") {
            Resolution::Endpoint(endpoint) => {
                assert_eq!(endpoint.ordinal(), 3);
                assert!(endpoint.ignores_packet_size_check());
            }
            _ => panic!("expected endpoint binding"),
        }
    }

    #[test]
    fn test_resolve_without_interface() {
        assert!(matches!(resolve(None, "pipe1"), Resolution::NotFound));
        // The control handle opens fine before attach completes.
        assert!(matches!(resolve(None, ""), Resolution::ControlOnly));
    }

    #[test]
    fn test_trailing_ordinal_parsing() {
        assert_eq!(trailing_ordinal("foo3"), Some(3));
        assert_eq!(trailing_ordinal("foo12"), Some(12));
        assert_eq!(trailing_ordinal("pipe07"), Some(7));
        assert_eq!(trailing_ordinal("3"), Some(3));
        assert_eq!(trailing_ordinal("foo"), None);
        // Digits followed by a non-digit suffix still name the ordinal.
        assert_eq!(trailing_ordinal("ep2x"), Some(2));
    }

    #[test]
    fn test_trailing_ordinal_rejects_wide_values() {
        assert_eq!(trailing_ordinal("pipe255"), Some(255));
        assert_eq!(trailing_ordinal("pipe256"), None);
        assert_eq!(trailing_ordinal("pipe99999999999999999999"), None);
    }
}
