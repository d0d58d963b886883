//! Chunked transfer engine
//!
//! Drives one logical read of arbitrary length as a sequence of bounded
//! sub-transfers over a single endpoint. The job's cursor and remaining
//! length are the only persisted state; the task suspends between a
//! stage's submission and its completion, so sub-transfers within one job
//! are strictly sequential and destination writes stay in order.
//!
//! A transport failure hands the endpoint to the recovery worker and
//! finishes the request with the failure status; recovery itself never
//! runs on this path.

use std::sync::Arc;

use protocol::{TransferDirection, TransferFlags, UsbError};
use tracing::{debug, trace, warn};

use crate::usb::backend::TransferBlock;
use crate::usb::device::Device;
use crate::usb::endpoint::Endpoint;
use crate::usb::recovery::RecoveryScheduler;

/// Largest single sub-transfer the engine will ever issue (bytes)
pub const MAX_TRANSFER_SIZE: usize = 65535;

/// Accounting state of one in-flight read request
///
/// Owned exclusively by the request; dropped (and with it the job's staging
/// resources) on the single completion path.
struct ReadJob {
    remaining: usize,
    transferred: usize,
    cursor: usize,
    stages: u32,
}

impl ReadJob {
    fn new(total: usize) -> Self {
        Self {
            remaining: total,
            transferred: 0,
            cursor: 0,
            stages: 0,
        }
    }

    fn next_stage_len(&self) -> usize {
        self.remaining.min(MAX_TRANSFER_SIZE)
    }

    /// Account one successful stage of `stage_len` that moved `got` bytes
    fn complete_stage(&mut self, stage_len: usize, got: usize) {
        self.remaining -= stage_len;
        self.transferred += got;
        self.cursor += got;
        self.stages += 1;
    }
}

/// Run one chunked read against `endpoint`, filling `dest`
///
/// Issues `ceil(dest.len() / MAX_TRANSFER_SIZE)` sub-transfers on the
/// full-success path; a short stage ends the job successfully with the
/// bytes accumulated so far. A zero-length request completes immediately
/// without touching the transport.
pub(crate) async fn run_read(
    device: &Arc<Device>,
    endpoint: &Arc<Endpoint>,
    dest: &mut [u8],
    recovery: &RecoveryScheduler,
) -> Result<usize, UsbError> {
    let total = dest.len();
    if total == 0 {
        return Ok(0);
    }

    let mut job = ReadJob::new(total);
    debug!(ordinal = endpoint.ordinal(), total, "read begins");

    loop {
        let stage_len = job.next_stage_len();
        let block = TransferBlock {
            endpoint_address: endpoint.address(),
            direction: TransferDirection::In,
            length: stage_len as u32,
            flags: TransferFlags::IN_SHORT_OK,
        };

        trace!(
            stage = job.stages,
            stage_len,
            remaining = job.remaining,
            "staging sub-transfer"
        );

        let completion = match endpoint.target().submit(&block) {
            Ok(future) => future.await,
            Err(err) => Err(err),
        };

        match completion {
            Err(err) => {
                warn!(
                    ordinal = endpoint.ordinal(),
                    %err,
                    transferred = job.transferred,
                    "sub-transfer failed, scheduling recovery"
                );
                recovery.schedule(device, endpoint);
                return Err(err);
            }
            Ok(data) => {
                let got = data.len().min(stage_len);
                dest[job.cursor..job.cursor + got].copy_from_slice(&data[..got]);
                job.complete_stage(stage_len, got);

                if got < stage_len {
                    debug!(
                        ordinal = endpoint.ordinal(),
                        got,
                        stage_len,
                        total = job.transferred,
                        "short stage ends read"
                    );
                    return Ok(job.transferred);
                }
                if job.remaining == 0 {
                    debug!(
                        ordinal = endpoint.ordinal(),
                        stages = job.stages,
                        total = job.transferred,
                        "read complete"
                    );
                    return Ok(job.transferred);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_length_is_bounded() {
        let job = ReadJob::new(200_000);
        assert_eq!(job.next_stage_len(), MAX_TRANSFER_SIZE);

        let job = ReadJob::new(100);
        assert_eq!(job.next_stage_len(), 100);
    }

    #[test]
    fn test_stage_accounting() {
        let mut job = ReadJob::new(200_000);
        job.complete_stage(MAX_TRANSFER_SIZE, MAX_TRANSFER_SIZE);
        assert_eq!(job.remaining, 200_000 - MAX_TRANSFER_SIZE);
        assert_eq!(job.transferred, MAX_TRANSFER_SIZE);
        assert_eq!(job.cursor, MAX_TRANSFER_SIZE);

        // A short stage still retires the whole stage length from the
        // remaining count while only advancing the cursor by what arrived.
        job.complete_stage(MAX_TRANSFER_SIZE, 30_000);
        assert_eq!(job.transferred, MAX_TRANSFER_SIZE + 30_000);
        assert_eq!(job.cursor, MAX_TRANSFER_SIZE + 30_000);
        assert_eq!(job.stages, 2);
    }
}
