//! In-memory transport fakes
//!
//! Always compiled so unit tests and integration tests share one fake
//! transport. [`FakeEndpoint`] scripts per-stage completions for the
//! transfer engine; [`FakeBackend`] records every synchronous device
//! operation in a journal the tests assert on. An endpoint created with
//! [`FakeBackend::endpoint`] shares the backend's journal, so reset
//! sequencing across both traits is observable in one place.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use protocol::{ControlSetup, TransferFlags, UsbError};

use crate::usb::backend::{DeviceBackend, EndpointIo, TransferBlock};

type Journal = Arc<Mutex<Vec<String>>>;

/// Scripted behavior for one sub-transfer stage
#[derive(Debug, Clone)]
pub enum StagePlan {
    /// Complete with exactly the requested length
    Full,
    /// Complete short, with this many bytes
    Short(usize),
    /// Fail with this error
    Fail(UsbError),
}

/// Scriptable in-memory endpoint transport
///
/// Stages complete according to the queued [`StagePlan`]s; an empty queue
/// means every stage completes full-length. Returned payloads carry a
/// running byte counter, so destination ordering is checkable end to end.
pub struct FakeEndpoint {
    ordinal: u8,
    journal: Journal,
    plan: Mutex<VecDeque<StagePlan>>,
    submitted: Mutex<Vec<usize>>,
    fill_cursor: Mutex<u64>,
}

impl FakeEndpoint {
    pub fn new() -> Self {
        Self::with_journal(Arc::new(Mutex::new(Vec::new())), 0)
    }

    fn with_journal(journal: Journal, ordinal: u8) -> Self {
        Self {
            ordinal,
            journal,
            plan: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            fill_cursor: Mutex::new(0),
        }
    }

    /// Queue the behavior of the next unscripted stage
    pub fn push_stage(&self, plan: StagePlan) {
        self.plan.lock().unwrap().push_back(plan);
    }

    /// Lengths of every submitted stage, in submission order
    pub fn submitted_lengths(&self) -> Vec<usize> {
        self.submitted.lock().unwrap().clone()
    }

    fn fill(&self, len: usize) -> Bytes {
        let mut cursor = self.fill_cursor.lock().unwrap();
        let data: Vec<u8> = (*cursor..*cursor + len as u64)
            .map(|i| (i % 256) as u8)
            .collect();
        *cursor += len as u64;
        Bytes::from(data)
    }
}

impl Default for FakeEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointIo for FakeEndpoint {
    fn submit(&self, block: &TransferBlock) -> BoxFuture<'static, Result<Bytes, UsbError>> {
        let requested = block.length as usize;
        self.submitted.lock().unwrap().push(requested);

        let plan = self
            .plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StagePlan::Full);

        let result = match plan {
            StagePlan::Full => Ok(self.fill(requested)),
            StagePlan::Short(n) => Ok(self.fill(n.min(requested))),
            StagePlan::Fail(err) => Err(err),
        };
        futures::future::ready(result).boxed()
    }

    fn cancel_all(&self) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("cancel ep{}", self.ordinal));
    }
}

/// Journaling fake of the synchronous device backend
pub struct FakeBackend {
    journal: Journal,
    fail_pipe_reset: AtomicBool,
    fail_port_reset: AtomicBool,
    connected: AtomicBool,
    vendor_failure: Mutex<Option<UsbError>>,
    vendor_read_data: Mutex<Option<Vec<u8>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            journal: Arc::new(Mutex::new(Vec::new())),
            fail_pipe_reset: AtomicBool::new(false),
            fail_port_reset: AtomicBool::new(false),
            connected: AtomicBool::new(true),
            vendor_failure: Mutex::new(None),
            vendor_read_data: Mutex::new(None),
        }
    }

    /// Create an endpoint transport that journals alongside this backend
    pub fn endpoint(&self, ordinal: u8) -> Arc<FakeEndpoint> {
        Arc::new(FakeEndpoint::with_journal(
            Arc::clone(&self.journal),
            ordinal,
        ))
    }

    /// Make every subsequent pipe reset fail
    pub fn fail_pipe_reset(&self) {
        self.fail_pipe_reset.store(true, Ordering::Release);
    }

    /// Make every subsequent port reset fail
    pub fn fail_port_reset(&self) {
        self.fail_port_reset.store(true, Ordering::Release);
    }

    /// Simulate surprise removal
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Make every subsequent vendor transfer fail
    pub fn fail_vendor(&self, err: UsbError) {
        *self.vendor_failure.lock().unwrap() = Some(err);
    }

    /// Set the canned reply returned by subsequent vendor reads
    pub fn set_vendor_read_data(&self, data: Vec<u8>) {
        *self.vendor_read_data.lock().unwrap() = Some(data);
    }

    /// Every recorded operation, in call order
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBackend for FakeBackend {
    fn reset_pipe(&self, ordinal: u8) -> Result<(), UsbError> {
        self.record(format!("reset_pipe {}", ordinal));
        if self.fail_pipe_reset.load(Ordering::Acquire) {
            return Err(UsbError::Stall);
        }
        Ok(())
    }

    fn is_connected(&self) -> Result<(), UsbError> {
        self.record("is_connected".to_string());
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(UsbError::Disconnected)
        }
    }

    fn reset_port(&self) -> Result<(), UsbError> {
        self.record("reset_port".to_string());
        if self.fail_port_reset.load(Ordering::Acquire) {
            return Err(UsbError::Io);
        }
        Ok(())
    }

    fn vendor_write(&self, setup: ControlSetup, length: u16, _buffer: u32) -> Result<u32, UsbError> {
        self.record(format!("vendor_write {:#04x} len {}", setup.request, length));
        if let Some(err) = self.vendor_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(length as u32)
    }

    fn vendor_read(
        &self,
        setup: ControlSetup,
        staging: &mut [u8],
        _flags: TransferFlags,
    ) -> Result<u32, UsbError> {
        self.record(format!(
            "vendor_read {:#04x} len {}",
            setup.request,
            staging.len()
        ));
        if let Some(err) = self.vendor_failure.lock().unwrap().clone() {
            return Err(err);
        }

        let returned = match self.vendor_read_data.lock().unwrap().as_deref() {
            Some(data) => {
                let n = data.len().min(staging.len());
                staging[..n].copy_from_slice(&data[..n]);
                n
            }
            None => {
                for (i, byte) in staging.iter_mut().enumerate() {
                    *byte = (i % 256) as u8;
                }
                staging.len()
            }
        };
        Ok(returned as u32)
    }

    fn select_alt_setting(&self, setting: u8) -> Result<(), UsbError> {
        self.record(format!("select_alt {}", setting));
        Ok(())
    }

    fn set_power_policy(
        &self,
        idle_timeout_ms: u64,
        allow_remote_wake: bool,
    ) -> Result<(), UsbError> {
        self.record(format!(
            "set_power_policy {} {}",
            idle_timeout_ms, allow_remote_wake
        ));
        Ok(())
    }
}
