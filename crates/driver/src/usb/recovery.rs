//! Recovery worker
//!
//! Transfer failures are recovered off the failing completion context:
//! the engine schedules a job and moves on, a dedicated blocking thread
//! performs the resets. Escalation is narrow to broad: reset the failing
//! pipe, and only if that fails reset the whole device. A failed recovery
//! is logged and reported in the outcome event, never retried, and never
//! re-surfaced to the original caller (whose request already completed
//! with its own failure status).

use std::sync::Arc;
use std::thread::JoinHandle;

use common::{work_channel, WorkHandle, WorkerEnd};
use protocol::UsbError;
use tracing::{debug, error, info, warn};

use crate::usb::device::Device;
use crate::usb::endpoint::Endpoint;

/// One unit of deferred recovery work
pub struct RecoveryJob {
    pub device: Arc<Device>,
    pub ordinal: u8,
}

/// Which reset level a recovery attempt ended on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// The pipe reset sufficed; the device was untouched
    PipeReset,
    /// Pipe reset failed; the full device reset sequence ran
    DeviceReset,
}

/// Outcome of one recovery job, emitted as an advisory event
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub ordinal: u8,
    pub action: RecoveryAction,
    pub status: Result<(), UsbError>,
}

/// Recovery state, logged as transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryState {
    Idle,
    PipeResetting,
    DeviceResetting,
}

/// Scheduling handle for the recovery worker
///
/// `schedule` never blocks, so it is safe to call from an I/O completion
/// context.
#[derive(Clone)]
pub struct RecoveryScheduler {
    handle: WorkHandle<RecoveryJob, RecoveryOutcome>,
}

impl RecoveryScheduler {
    /// Queue recovery for a failing endpoint
    pub fn schedule(&self, device: &Arc<Device>, endpoint: &Arc<Endpoint>) {
        let job = RecoveryJob {
            device: Arc::clone(device),
            ordinal: endpoint.ordinal(),
        };
        if let Err(err) = self.handle.schedule(job) {
            error!(%err, ordinal = endpoint.ordinal(), "failed to schedule recovery");
        }
    }

    /// Await the next recovery outcome event
    pub async fn next_outcome(&self) -> common::Result<RecoveryOutcome> {
        self.handle.recv_event().await
    }
}

/// Spawn the recovery worker thread
///
/// The worker runs until every [`RecoveryScheduler`] clone is dropped.
pub fn spawn_recovery_worker() -> (RecoveryScheduler, JoinHandle<()>) {
    let (handle, worker_end) = work_channel();

    let join = std::thread::Builder::new()
        .name("recovery-worker".to_string())
        .spawn(move || run_worker(worker_end))
        .expect("Failed to spawn recovery worker thread");

    (RecoveryScheduler { handle }, join)
}

fn run_worker(end: WorkerEnd<RecoveryJob, RecoveryOutcome>) {
    info!("recovery worker started");

    while let Ok(job) = end.recv_job() {
        let outcome = recover(&job);
        // Outcome events are advisory; drop them rather than stall.
        if let Err(err) = end.try_send_event(outcome) {
            debug!(%err, "recovery outcome not delivered");
        }
    }

    info!("recovery worker stopped");
}

/// Perform one recovery attempt: pipe reset, then device reset
fn recover(job: &RecoveryJob) -> RecoveryOutcome {
    let mut state = RecoveryState::PipeResetting;
    debug!(ordinal = job.ordinal, ?state, "recovery begins");

    match job.device.reset_pipe(job.ordinal) {
        Ok(()) => {
            state = RecoveryState::Idle;
            debug!(ordinal = job.ordinal, ?state, "pipe reset succeeded");
            RecoveryOutcome {
                ordinal: job.ordinal,
                action: RecoveryAction::PipeReset,
                status: Ok(()),
            }
        }
        Err(pipe_err) => {
            state = RecoveryState::DeviceResetting;
            warn!(
                ordinal = job.ordinal,
                %pipe_err,
                ?state,
                "pipe reset failed, resetting device"
            );

            let status = job.device.reset();
            state = RecoveryState::Idle;
            match status {
                Ok(()) => debug!(ordinal = job.ordinal, ?state, "device reset succeeded"),
                Err(ref err) => warn!(ordinal = job.ordinal, %err, ?state, "device reset failed"),
            }

            RecoveryOutcome {
                ordinal: job.ordinal,
                action: RecoveryAction::DeviceReset,
                status,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use crate::usb::device::{AttachConfig, EndpointBinding};
    use crate::usb::backend::EndpointIo;
    use protocol::DeviceDescriptorInfo;

    fn attach(backend: Arc<FakeBackend>) -> Arc<Device> {
        let io = backend.endpoint(0) as Arc<dyn EndpointIo>;
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
                endpoints: vec![EndpointBinding { address: 0x81, io }],
            },
        )
    }

    #[test]
    fn test_pipe_reset_success_stops_escalation() {
        let backend = Arc::new(FakeBackend::new());
        let device = attach(backend.clone());

        let outcome = recover(&RecoveryJob { device, ordinal: 0 });
        assert_eq!(outcome.action, RecoveryAction::PipeReset);
        assert!(outcome.status.is_ok());

        let journal = backend.journal();
        assert_eq!(journal, vec!["reset_pipe 0"]);
    }

    #[test]
    fn test_pipe_reset_failure_escalates_to_device_reset() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_pipe_reset();
        let device = attach(backend.clone());

        let outcome = recover(&RecoveryJob { device, ordinal: 0 });
        assert_eq!(outcome.action, RecoveryAction::DeviceReset);
        assert!(outcome.status.is_ok());

        let journal = backend.journal();
        assert_eq!(
            journal,
            vec!["reset_pipe 0", "cancel ep0", "is_connected", "reset_port"]
        );
    }
}
