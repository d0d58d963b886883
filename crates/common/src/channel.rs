//! Deferred-work channel bridge
//!
//! Bridges an execution context that must not block (an I/O completion
//! callback, an async task) and a dedicated blocking worker thread. Jobs
//! are scheduled without blocking; the worker processes them in order and
//! reports outcomes back as events.

use async_channel::{Receiver, Sender};

/// Handle held by the scheduling side
///
/// `schedule` never blocks the caller; the job queue is unbounded so a
/// completion context can always hand off work.
pub struct WorkHandle<J, E> {
    job_tx: Sender<J>,
    event_rx: Receiver<E>,
}

// Manual impl: the channel ends clone unconditionally, so handles stay
// cloneable even for move-only job types.
impl<J, E> Clone for WorkHandle<J, E> {
    fn clone(&self) -> Self {
        Self {
            job_tx: self.job_tx.clone(),
            event_rx: self.event_rx.clone(),
        }
    }
}

impl<J, E> WorkHandle<J, E> {
    /// Queue a job for the worker without blocking
    pub fn schedule(&self, job: J) -> crate::Result<()> {
        self.job_tx
            .try_send(job)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive the next worker outcome event
    pub async fn recv_event(&self) -> crate::Result<E> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive an outcome event from blocking code
    pub fn recv_event_blocking(&self) -> crate::Result<E> {
        self.event_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Handle held by the worker thread (blocking side)
pub struct WorkerEnd<J, E> {
    pub(crate) job_rx: Receiver<J>,
    event_tx: Sender<E>,
}

impl<J, E> WorkerEnd<J, E> {
    /// Receive the next job, blocking until one arrives
    ///
    /// Returns an error once every [`WorkHandle`] has been dropped, which
    /// is the worker's shutdown signal.
    pub fn recv_job(&self) -> crate::Result<J> {
        self.job_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Report a job outcome back to the scheduling side
    pub fn send_event(&self, event: E) -> crate::Result<()> {
        self.event_tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Report an outcome without blocking, dropping it if the queue is full
    ///
    /// Outcome events are advisory; a worker must never stall because no
    /// one is consuming them.
    pub fn try_send_event(&self, event: E) -> crate::Result<()> {
        self.event_tx
            .try_send(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the bridge between a non-blocking scheduler and a blocking worker
///
/// Returns (scheduling handle, worker end). The job queue is unbounded so
/// scheduling cannot block; the event queue is bounded since outcomes are
/// advisory and consumed promptly.
pub fn work_channel<J, E>() -> (WorkHandle<J, E>, WorkerEnd<J, E>) {
    let (job_tx, job_rx) = async_channel::unbounded();
    let (event_tx, event_rx) = async_channel::bounded(256);

    (
        WorkHandle { job_tx, event_rx },
        WorkerEnd { job_rx, event_tx },
    )
}
